//! Claude Code agent configuration and command construction.

/// Candidate executable names/paths checked, in order, inside the
/// sandbox before giving up with [`crate::AgentInvokeError::AgentNotFound`].
pub const EXECUTABLE_CANDIDATES: &[&str] = &[
    "claude",
    "/usr/local/bin/claude",
    "/opt/homebrew/bin/claude",
    "/root/.claude/local/claude",
    "/root/.npm-global/bin/claude",
];

pub const REQUIRED_ENV: &[&str] = &["ANTHROPIC_API_KEY"];

pub const INSTALL_HINT: &str = "install with: npm install -g @anthropic-ai/claude-code";

#[derive(Debug, Clone)]
pub struct ClaudeAgentConfig {
    pub model: Option<String>,
    pub max_turns: Option<u32>,
    pub permission_mode: Option<String>,
    pub system_prompt: Option<String>,
}

impl Default for ClaudeAgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_turns: Some(100),
            permission_mode: Some("bypassPermissions".to_string()),
            system_prompt: None,
        }
    }
}

impl ClaudeAgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn permission_mode(mut self, mode: impl Into<String>) -> Self {
        self.permission_mode = Some(mode.into());
        self
    }
}

/// Builds the argv run inside the sandbox. `executable` has already been
/// resolved against [`EXECUTABLE_CANDIDATES`]; `prompt_path` is the
/// sandbox-relative path the prompt was written to.
pub fn build_argv(executable: &str, config: &ClaudeAgentConfig, prompt_path: &str) -> Vec<String> {
    let mut argv = vec![
        executable.to_string(),
        "--output-format".to_string(),
        "stream-json".to_string(),
        "--print".to_string(),
        format!("@{prompt_path}"),
    ];

    if let Some(model) = &config.model {
        argv.push("--model".to_string());
        argv.push(model.clone());
    }
    if let Some(max_turns) = config.max_turns {
        argv.push("--max-turns".to_string());
        argv.push(max_turns.to_string());
    }
    if let Some(mode) = &config.permission_mode {
        argv.push("--permission-mode".to_string());
        argv.push(mode.clone());
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_sets_fields() {
        let config = ClaudeAgentConfig::new().model("claude-sonnet-4").max_turns(50).permission_mode("plan");
        assert_eq!(config.model, Some("claude-sonnet-4".to_string()));
        assert_eq!(config.max_turns, Some(50));
        assert_eq!(config.permission_mode, Some("plan".to_string()));
    }

    #[test]
    fn argv_never_contains_prompt_text_only_a_path() {
        let config = ClaudeAgentConfig::new();
        let argv = build_argv("claude", &config, ".task-prompt.md");
        assert!(argv.iter().any(|a| a.contains(".task-prompt.md")));
        assert!(!argv.iter().any(|a| a.contains("rm -rf")));
    }
}
