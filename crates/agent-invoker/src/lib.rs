//! One-shot AI coding agent invocation inside a provisioned sandbox.
//!
//! The contract is deliberately narrow: write the prompt to a file inside
//! the sandbox, run the agent's executable against that file, and report
//! back exit status plus captured output. There is no persistent session
//! and no protocol handshake — the agent is expected to exit once it has
//! made its edits.

pub mod agents;
mod discovery;
mod error;
mod types;

pub use error::{AgentInvokeError, Result};
pub use types::{AgentKind, InvokeOutcome, PROMPT_FILE};

use std::time::Duration;

use sandbox::{SandboxDriver, SandboxHandle};
use tracing::Instrument;

use agents::{claude, codex};

/// Per-kind configuration, wrapping each agent's own builder type.
#[derive(Debug, Clone)]
pub enum AgentConfig {
    Claude(claude::ClaudeAgentConfig),
    Codex(codex::CodexAgentConfig),
}

impl AgentConfig {
    pub fn kind(&self) -> AgentKind {
        match self {
            AgentConfig::Claude(_) => AgentKind::Claude,
            AgentConfig::Codex(_) => AgentKind::Codex,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig::Claude(claude::ClaudeAgentConfig::default())
    }
}

fn executable_candidates(kind: AgentKind) -> &'static [&'static str] {
    match kind {
        AgentKind::Claude => claude::EXECUTABLE_CANDIDATES,
        AgentKind::Codex => codex::EXECUTABLE_CANDIDATES,
    }
}

fn install_hint(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::Claude => claude::INSTALL_HINT,
        AgentKind::Codex => codex::INSTALL_HINT,
    }
}

/// Required environment variable names for `kind`. The caller (the task
/// runner) is responsible for actually supplying values; this crate only
/// documents which names each agent expects.
pub fn required_env(kind: AgentKind) -> &'static [&'static str] {
    match kind {
        AgentKind::Claude => claude::REQUIRED_ENV,
        AgentKind::Codex => codex::REQUIRED_ENV,
    }
}

/// Writes `prompt` to [`PROMPT_FILE`] inside the sandbox, invokes the
/// configured agent against it, and returns the captured result.
///
/// `env` supplies the per-task credential for the agent's provider; it is
/// passed straight through to the sandbox command, never logged here.
pub async fn invoke(
    driver: &dyn SandboxDriver,
    handle: &SandboxHandle,
    config: &AgentConfig,
    prompt: &str,
    env: &[(String, String)],
    timeout: Duration,
) -> Result<InvokeOutcome> {
    let kind = config.kind();
    let span = tracing::info_span!("agent.invoke", agent = kind.as_str(), handle = %handle.id);

    async move {
        driver
            .write_file(handle, PROMPT_FILE, prompt.as_bytes(), 0o600)
            .await
            .map_err(|e| AgentInvokeError::PromptDelivery(e.to_string()))?;

        if let AgentConfig::Codex(_) = config {
            driver
                .write_file(handle, codex::HELPER_SCRIPT_PATH, codex::helper_script().as_bytes(), 0o700)
                .await
                .map_err(|e| AgentInvokeError::PromptDelivery(e.to_string()))?;
        }

        let executable = discovery::resolve_executable(driver, handle, executable_candidates(kind), install_hint(kind)).await?;

        let argv = match config {
            AgentConfig::Claude(c) => claude::build_argv(&executable, c, PROMPT_FILE),
            AgentConfig::Codex(c) => codex::build_argv(&executable, c, PROMPT_FILE),
        };

        tracing::info!(agent = kind.as_str(), "invoking agent");
        let result = driver.run(handle, &argv, env, None, timeout).await?;

        if result.timed_out {
            tracing::warn!(agent = kind.as_str(), "agent invocation timed out");
            return Err(AgentInvokeError::AgentTimeout);
        }

        if !result.success() {
            let sanitized_stderr = secrets::scrub(&result.stderr_lossy(), None);
            tracing::warn!(agent = kind.as_str(), exit_code = result.exit_code, "agent exited non-zero");
            return Err(AgentInvokeError::AgentError {
                exit_code: result.exit_code,
                sanitized_stderr,
            });
        }

        Ok(InvokeOutcome {
            exit_code: result.exit_code,
            stdout: result.stdout_lossy(),
            stderr: result.stderr_lossy(),
        })
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_kind_round_trips_through_str() {
        use std::str::FromStr;
        assert_eq!(AgentKind::from_str("claude").unwrap(), AgentKind::Claude);
        assert_eq!(AgentKind::from_str("codex").unwrap(), AgentKind::Codex);
        assert!(AgentKind::from_str("gpt").is_err());
    }

    #[test]
    fn required_env_is_nonempty_for_each_kind() {
        assert!(!required_env(AgentKind::Claude).is_empty());
        assert!(!required_env(AgentKind::Codex).is_empty());
    }

    #[test]
    fn default_config_is_claude() {
        assert_eq!(AgentConfig::default().kind(), AgentKind::Claude);
    }
}
