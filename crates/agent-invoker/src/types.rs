use serde::{Deserialize, Serialize};

/// Relative path, inside the sandbox workspace, that the prompt is
/// written to. The agent is told to read from this path; the prompt
/// text itself never appears in an argv or a shell string.
pub const PROMPT_FILE: &str = ".task-prompt.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Claude,
    Codex,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Claude => "claude",
            AgentKind::Codex => "codex",
        }
    }
}

impl std::str::FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(AgentKind::Claude),
            "codex" => Ok(AgentKind::Codex),
            other => Err(format!("unknown agent kind: {other}")),
        }
    }
}

/// Result of a successful (non-erroring, non-timed-out) agent run.
#[derive(Debug, Clone)]
pub struct InvokeOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}
