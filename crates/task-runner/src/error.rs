use task_store::{FailureReason, TaskResult};
use thiserror::Error;

/// Internal step failures, each carrying enough detail to be mapped onto
/// exactly one [`FailureReason`] and a scrubbed message by the caller.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("provisioning failed: {0}")]
    Provision(String),

    #[error("clone failed: {reason}: {message}")]
    Clone { reason: git_workspace::CloneReason, message: String },

    #[error("agent exited with an error: {message}")]
    AgentExit { message: String, partial: Option<TaskResult> },

    #[error("agent timed out")]
    AgentTimeout { partial: Option<TaskResult> },

    #[error("agent produced no changes")]
    NoChanges,

    #[error("commit failed: {0}")]
    Commit(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RunError {
    pub fn reason(&self) -> FailureReason {
        match self {
            RunError::Provision(_) => FailureReason::Provision,
            RunError::Clone { reason, .. } => match reason {
                git_workspace::CloneReason::Auth => FailureReason::CloneAuth,
                git_workspace::CloneReason::NotFound => FailureReason::CloneNotFound,
                git_workspace::CloneReason::Network => FailureReason::CloneNetwork,
                git_workspace::CloneReason::Timeout => FailureReason::CloneTimeout,
            },
            RunError::AgentExit { .. } => FailureReason::AgentExit,
            RunError::AgentTimeout { .. } => FailureReason::AgentTimeout,
            RunError::NoChanges => FailureReason::NoChanges,
            RunError::Commit(_) => FailureReason::Commit,
            RunError::Internal(_) => FailureReason::Internal,
        }
    }

    /// The partial diff/patch captured before this failure, if the agent
    /// had made any edits before exiting or timing out.
    pub fn partial_result(&self) -> Option<TaskResult> {
        match self {
            RunError::AgentExit { partial, .. } => partial.clone(),
            RunError::AgentTimeout { partial } => partial.clone(),
            _ => None,
        }
    }

    pub(crate) fn set_partial(&mut self, result: TaskResult) {
        match self {
            RunError::AgentExit { partial, .. } => *partial = Some(result),
            RunError::AgentTimeout { partial } => *partial = Some(result),
            _ => {}
        }
    }
}
