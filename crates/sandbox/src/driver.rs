use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ProvisionError, SandboxError};
use crate::types::{ExecResult, ResourceLimits, SandboxHandle};

/// Capability set exposed by any sandbox backend.
///
/// Both the isolated-container backend and the remote-provider backend
/// implement this trait; the task runner never knows which one it is
/// talking to.
#[async_trait]
pub trait SandboxDriver: Send + Sync {
    /// Provisions a fresh sandbox from `template`, applying `limits`.
    async fn provision(
        &self,
        handle: &SandboxHandle,
        template: &str,
        limits: &ResourceLimits,
    ) -> Result<(), ProvisionError>;

    /// Runs `argv` inside the sandbox, capturing bounded stdout/stderr.
    async fn run(
        &self,
        handle: &SandboxHandle,
        argv: &[String],
        env: &[(String, String)],
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<ExecResult, SandboxError>;

    async fn write_file(
        &self,
        handle: &SandboxHandle,
        path: &str,
        bytes: &[u8],
        mode: u32,
    ) -> Result<(), SandboxError>;

    async fn read_file(&self, handle: &SandboxHandle, path: &str) -> Result<Vec<u8>, SandboxError>;

    /// Tears down the sandbox. Must be idempotent: calling it twice, or
    /// calling it on a sandbox that already died on its own, is not an
    /// error.
    async fn teardown(&self, handle: &SandboxHandle) -> Result<(), SandboxError>;

    /// Lists every sandbox this backend currently knows about, including
    /// ones this process did not itself provision. Used by the fleet
    /// supervisor's orphan sweeper; backends are expected to return
    /// handles named with the `ai-code-task-` convention alongside
    /// whatever else they might be hosting.
    async fn list_handles(&self) -> Result<Vec<SandboxHandle>, SandboxError>;
}
