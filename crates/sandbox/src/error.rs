use thiserror::Error;

/// Failure reasons returned by [`crate::SandboxDriver::provision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionReason {
    Quota,
    Auth,
    TemplateMissing,
    Transport,
}

impl std::fmt::Display for ProvisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProvisionReason::Quota => "quota",
            ProvisionReason::Auth => "auth",
            ProvisionReason::TemplateMissing => "template_missing",
            ProvisionReason::Transport => "transport",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("sandbox provisioning failed: {reason} ({message})")]
    Failed {
        reason: ProvisionReason,
        message: String,
    },
}

impl ProvisionError {
    pub fn reason(&self) -> ProvisionReason {
        match self {
            ProvisionError::Failed { reason, .. } => *reason,
        }
    }
}

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox command spawn failed: {0}")]
    Spawn(String),

    #[error("sandbox io error: {0}")]
    Io(String),

    #[error("sandbox handle {0} not found or already torn down")]
    HandleNotFound(String),

    #[error("remote sandbox provider error: {0}")]
    Provider(String),
}

pub type Result<T, E = SandboxError> = std::result::Result<T, E>;
