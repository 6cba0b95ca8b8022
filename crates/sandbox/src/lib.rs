//! Sandboxed execution environments for the task execution engine.
//!
//! [`SandboxDriver`] is the single contract the task runner speaks; two
//! implementations satisfy it — [`ContainerDriver`] for a locally managed
//! container runtime, and [`RemoteDriver`] for an external sandbox-as-a-
//! service provider. Callers select one by configuration, never by type.

mod container;
mod driver;
mod error;
mod remote;
mod types;

pub use container::{ContainerDriver, is_safe_relative_path};
pub use driver::SandboxDriver;
pub use error::{ProvisionError, ProvisionReason, SandboxError};
pub use remote::RemoteDriver;
pub use types::{
    AGENT_TIMEOUT, Backend, CLONE_TIMEOUT, DEFAULT_COMMAND_TIMEOUT, DEFAULT_CPU_SHARES,
    DEFAULT_MEMORY_LIMIT_MB, ExecResult, MAX_CAPTURED_BYTES, ResourceLimits, SANDBOX_LIFETIME,
    SandboxHandle, bound_output,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_name_matches_orphan_sweep_prefix() {
        let h = SandboxHandle::new(42, Backend::Container);
        assert_eq!(h.id, "ai-code-task-42");
        assert!(h.id.starts_with("ai-code-task-"));
    }

    #[test]
    fn resource_limits_default_to_nonroot() {
        let limits = ResourceLimits::default();
        assert_ne!(limits.uid, 0);
        assert_ne!(limits.gid, 0);
        assert_eq!(limits.memory_mb, DEFAULT_MEMORY_LIMIT_MB);
    }

    #[test]
    fn bound_output_truncates_oversized_buffers() {
        let huge = vec![b'a'; MAX_CAPTURED_BYTES + 10];
        let bounded = bound_output(huge);
        assert!(bounded.len() < MAX_CAPTURED_BYTES + 10);
        assert!(bounded.ends_with(b"...[truncated]...\n"));
    }

    #[test]
    fn bound_output_leaves_small_buffers_untouched() {
        let small = vec![b'a'; 16];
        assert_eq!(bound_output(small.clone()), small);
    }
}
