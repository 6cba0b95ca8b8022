use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneReason {
    Auth,
    NotFound,
    Network,
    Timeout,
}

impl std::fmt::Display for CloneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CloneReason::Auth => "auth",
            CloneReason::NotFound => "not_found",
            CloneReason::Network => "network",
            CloneReason::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum GitError {
    #[error("clone failed: {reason} ({message})")]
    Clone { reason: CloneReason, message: String },

    #[error("branch creation failed: {0}")]
    Branch(String),

    #[error("diff computation failed: {0}")]
    Diff(String),

    #[error("refusing to commit an empty diff")]
    EmptyDiff,

    #[error("commit failed: {0}")]
    Commit(String),

    #[error("patch export failed: {0}")]
    Patch(String),
}

pub type Result<T> = std::result::Result<T, GitError>;

/// Classifies a raw libgit2 error into a [`CloneReason`] without ever
/// echoing the underlying message verbatim (it may embed the repo URL
/// with a credential still attached to it in some libgit2 versions).
pub fn classify_clone_error(err: &git2::Error) -> CloneReason {
    use git2::ErrorClass;
    match err.class() {
        ErrorClass::Net => CloneReason::Network,
        ErrorClass::Ssh | ErrorClass::Http => {
            if matches!(err.code(), git2::ErrorCode::Auth) {
                CloneReason::Auth
            } else {
                CloneReason::Network
            }
        }
        _ if matches!(err.code(), git2::ErrorCode::Auth) => CloneReason::Auth,
        _ if matches!(err.code(), git2::ErrorCode::NotFound) => CloneReason::NotFound,
        _ => CloneReason::Network,
    }
}
