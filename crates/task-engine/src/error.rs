use thiserror::Error;

/// Errors surfaced by the command interface, one variant per error kind
/// the external boundary is allowed to see.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("principal is not authorized for this task")]
    Unauthorized,

    #[error("task not found")]
    NotFound,

    #[error("rate limit exceeded for this user")]
    RateLimited,

    #[error("diff not ready: task has not completed")]
    NotReady,

    #[error("task is already in a terminal state")]
    TerminalState,

    #[error("engine is shutting down, not accepting new tasks")]
    ShuttingDown,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<task_store::TaskStoreError> for EngineError {
    fn from(err: task_store::TaskStoreError) -> Self {
        match err {
            task_store::TaskStoreError::NotFound(_) => EngineError::NotFound,
            task_store::TaskStoreError::Unauthorized(_) => EngineError::Unauthorized,
            task_store::TaskStoreError::InvalidTransition { .. } => EngineError::TerminalState,
        }
    }
}

impl From<fleet_supervisor::SupervisorError> for EngineError {
    fn from(err: fleet_supervisor::SupervisorError) -> Self {
        match err {
            fleet_supervisor::SupervisorError::ShuttingDown => EngineError::ShuttingDown,
        }
    }
}
