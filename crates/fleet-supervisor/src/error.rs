use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("engine is shutting down, not accepting new tasks")]
    ShuttingDown,
}
