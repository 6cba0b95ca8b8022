use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaskStoreError>;

#[derive(Debug, Error)]
pub enum TaskStoreError {
    #[error("task {0} not found")]
    NotFound(crate::types::TaskId),

    #[error("task {0} does not belong to the requesting user")]
    Unauthorized(crate::types::TaskId),

    #[error("invalid status transition for task {task_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        task_id: crate::types::TaskId,
        from: crate::types::TaskStatus,
        to: crate::types::TaskStatus,
    },
}
