use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Maximum bytes captured per output stream before truncation.
pub const MAX_CAPTURED_BYTES: usize = 1024 * 1024;

pub const TRUNCATION_MARKER: &str = "\n...[truncated]...\n";

/// Total wall-clock budget for a single sandbox's lifetime.
pub const SANDBOX_LIFETIME: Duration = Duration::from_secs(10 * 60);

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
pub const CLONE_TIMEOUT: Duration = Duration::from_secs(60);
pub const AGENT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 2048;
pub const DEFAULT_CPU_SHARES: u64 = 1024;

/// Which backend a [`SandboxHandle`] was provisioned by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Container,
    Remote,
}

/// An opaque, externally owned sandbox resource.
///
/// Every handle is tied to a task id so the fleet supervisor's orphan
/// sweeper can recognize sandboxes it owns among whatever else a shared
/// backend might be running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxHandle {
    pub id: String,
    pub backend: Backend,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl SandboxHandle {
    pub fn name_for_task(task_id: i64) -> String {
        format!("ai-code-task-{task_id}")
    }

    pub fn new(task_id: i64, backend: Backend) -> Self {
        Self {
            id: Self::name_for_task(task_id),
            backend,
            created_at: chrono::Utc::now(),
        }
    }

    /// Generates an id for sandboxes not bound to a specific task (used in
    /// tests and ad hoc tooling).
    pub fn anonymous(backend: Backend) -> Self {
        Self {
            id: format!("ai-code-sandbox-{}", Uuid::new_v4()),
            backend,
            created_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub memory_mb: u64,
    pub cpu_shares: u64,
    pub uid: u32,
    pub gid: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_mb: DEFAULT_MEMORY_LIMIT_MB,
            cpu_shares: DEFAULT_CPU_SHARES,
            uid: 1000,
            gid: 1000,
        }
    }
}

/// Outcome of running a single command inside a sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Truncates `buf` in place to [`MAX_CAPTURED_BYTES`], appending a marker
/// if anything was cut.
pub fn bound_output(mut buf: Vec<u8>) -> Vec<u8> {
    if buf.len() > MAX_CAPTURED_BYTES {
        buf.truncate(MAX_CAPTURED_BYTES);
        buf.extend_from_slice(TRUNCATION_MARKER.as_bytes());
    }
    buf
}
