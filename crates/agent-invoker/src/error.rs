use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentInvokeError>;

#[derive(Error, Debug)]
pub enum AgentInvokeError {
    #[error("agent executable not found: {0}")]
    AgentNotFound(String),

    #[error("agent exited with status {exit_code}: {sanitized_stderr}")]
    AgentError { exit_code: i32, sanitized_stderr: String },

    #[error("agent timed out")]
    AgentTimeout,

    #[error("failed to write prompt into sandbox: {0}")]
    PromptDelivery(String),

    #[error("sandbox error during agent invocation: {0}")]
    Sandbox(#[from] sandbox::SandboxError),
}
