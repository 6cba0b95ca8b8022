//! Codex agent configuration and command construction.
//!
//! Codex additionally wants a small repo-analysis helper uploaded to the
//! sandbox ahead of the main invocation; [`helper_script`] provides it so
//! the runner can `write_file` it before calling [`build_argv`].

pub const EXECUTABLE_CANDIDATES: &[&str] = &[
    "codex",
    "/usr/local/bin/codex",
    "/opt/homebrew/bin/codex",
    "/root/.npm-global/bin/codex",
];

pub const REQUIRED_ENV: &[&str] = &["OPENAI_API_KEY"];

pub const INSTALL_HINT: &str = "install with: npm install -g @openai/codex";

pub const HELPER_SCRIPT_PATH: &str = ".codex-repo-context.sh";

#[derive(Debug, Clone)]
pub struct CodexAgentConfig {
    pub model: Option<String>,
    pub sandbox_mode: Option<String>,
    pub max_thinking_budget: Option<u32>,
}

impl Default for CodexAgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            sandbox_mode: Some("workspace-write".to_string()),
            max_thinking_budget: None,
        }
    }
}

impl CodexAgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn sandbox_mode(mut self, mode: impl Into<String>) -> Self {
        self.sandbox_mode = Some(mode.into());
        self
    }

    pub fn max_thinking_budget(mut self, budget: u32) -> Self {
        self.max_thinking_budget = Some(budget);
        self
    }
}

/// A small shell script that lists tracked files so Codex can ground its
/// plan in the repository's actual shape before editing. Uploaded once,
/// referenced from the prompt, never executed implicitly.
pub fn helper_script() -> &'static str {
    "#!/bin/sh\ngit ls-files | head -n 500\n"
}

pub fn build_argv(executable: &str, config: &CodexAgentConfig, prompt_path: &str) -> Vec<String> {
    let mut argv = vec![
        executable.to_string(),
        "exec".to_string(),
        "--experimental-json".to_string(),
        format!("@{prompt_path}"),
    ];

    if let Some(model) = &config.model {
        argv.push("--model".to_string());
        argv.push(model.clone());
    }
    if let Some(mode) = &config.sandbox_mode {
        argv.push("--sandbox".to_string());
        argv.push(mode.clone());
    }
    if let Some(budget) = config.max_thinking_budget {
        argv.push("--max-thinking-budget".to_string());
        argv.push(budget.to_string());
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_sets_fields() {
        let config = CodexAgentConfig::new().model("gpt-4").sandbox_mode("full-access").max_thinking_budget(10000);
        assert_eq!(config.model, Some("gpt-4".to_string()));
        assert_eq!(config.sandbox_mode, Some("full-access".to_string()));
        assert_eq!(config.max_thinking_budget, Some(10000));
    }

    #[test]
    fn helper_script_only_reads_does_not_mutate() {
        assert!(!helper_script().contains("rm "));
    }
}
