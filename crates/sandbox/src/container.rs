//! Isolated-container sandbox backend.
//!
//! Shells out to a container runtime (`docker` or `podman`, either works —
//! both speak the same CLI surface used here) to provision a long-lived,
//! non-root container per task, run commands inside it via `exec`, and move
//! files in and out via `cp`. The container never shares host namespaces
//! and runs with a fixed, narrow capability set.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::Instrument;

use crate::driver::SandboxDriver;
use crate::error::{ProvisionError, ProvisionReason, SandboxError};
use crate::types::{ExecResult, ResourceLimits, SandboxHandle, bound_output};

/// Runs the isolated-container backend against a specific runtime binary
/// (`docker`, `podman`, ...).
pub struct ContainerDriver {
    runtime_binary: String,
    workspace_base: std::path::PathBuf,
}

impl ContainerDriver {
    pub fn new(runtime_binary: impl Into<String>, workspace_base: impl Into<std::path::PathBuf>) -> Self {
        Self {
            runtime_binary: runtime_binary.into(),
            workspace_base: workspace_base.into(),
        }
    }

    fn workspace_mount(&self, handle: &SandboxHandle) -> std::path::PathBuf {
        self.workspace_base.join(&handle.id)
    }

    async fn run_runtime(&self, args: &[&str]) -> Result<std::process::Output, SandboxError> {
        tracing::debug!(runtime = %self.runtime_binary, args = ?args, "invoking container runtime");
        Command::new(&self.runtime_binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SandboxError::Spawn(format!("{} {:?}: {e}", self.runtime_binary, args)))
    }
}

#[async_trait]
impl SandboxDriver for ContainerDriver {
    async fn provision(
        &self,
        handle: &SandboxHandle,
        template: &str,
        limits: &ResourceLimits,
    ) -> Result<(), ProvisionError> {
        let span = tracing::info_span!("sandbox.provision", handle = %handle.id);
        async move {
            let mount = self.workspace_mount(handle);
            if let Err(e) = tokio::fs::create_dir_all(&mount).await {
                return Err(ProvisionError::Failed {
                    reason: ProvisionReason::Transport,
                    message: format!("failed to create workspace mount: {e}"),
                });
            }

            let mem_limit = format!("{}m", limits.memory_mb);
            let cpu_shares = limits.cpu_shares.to_string();
            let user = format!("{}:{}", limits.uid, limits.gid);
            let mount_arg = format!("{}:/workspace:rw", mount.display());

            let args = vec![
                "run",
                "-d",
                "--name",
                handle.id.as_str(),
                "--user",
                user.as_str(),
                "--memory",
                mem_limit.as_str(),
                "--cpu-shares",
                cpu_shares.as_str(),
                "--security-opt",
                "no-new-privileges",
                "--cap-drop",
                "ALL",
                "--network",
                "none",
                "-v",
                mount_arg.as_str(),
                "-w",
                "/workspace",
                template,
                "sleep",
                "infinity",
            ];

            let output = self.run_runtime(&args).await.map_err(|e| ProvisionError::Failed {
                reason: ProvisionReason::Transport,
                message: e.to_string(),
            })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let reason = if stderr.contains("No such image") || stderr.contains("pull access denied") {
                    ProvisionReason::TemplateMissing
                } else if stderr.contains("permission denied") || stderr.contains("unauthorized") {
                    ProvisionReason::Auth
                } else if stderr.contains("quota") || stderr.contains("resource") {
                    ProvisionReason::Quota
                } else {
                    ProvisionReason::Transport
                };
                return Err(ProvisionError::Failed {
                    reason,
                    message: stderr.trim().to_string(),
                });
            }

            tracing::info!(handle = %handle.id, "sandbox provisioned");
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        handle: &SandboxHandle,
        argv: &[String],
        env: &[(String, String)],
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<ExecResult, SandboxError> {
        let mut args: Vec<String> = vec!["exec".to_string(), "-i".to_string()];
        for (k, v) in env {
            args.push("-e".to_string());
            args.push(format!("{k}={v}"));
        }
        args.push(handle.id.clone());
        args.extend(argv.iter().cloned());

        let mut cmd = Command::new(&self.runtime_binary);
        cmd.args(&args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| SandboxError::Spawn(format!("exec in {}: {e}", handle.id)))?;

        if let (Some(data), Some(mut pipe)) = (stdin, child.stdin.take()) {
            let _ = pipe.write_all(data).await;
            drop(pipe);
        }

        let run_fut = child.wait_with_output();
        match tokio::time::timeout(timeout, run_fut).await {
            Ok(Ok(output)) => Ok(ExecResult {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: bound_output(output.stdout),
                stderr: bound_output(output.stderr),
                timed_out: false,
            }),
            Ok(Err(e)) => Err(SandboxError::Io(e.to_string())),
            Err(_) => {
                tracing::warn!(handle = %handle.id, ?timeout, "command timed out");
                Ok(ExecResult {
                    exit_code: -1,
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                    timed_out: true,
                })
            }
        }
    }

    async fn write_file(
        &self,
        handle: &SandboxHandle,
        path: &str,
        bytes: &[u8],
        mode: u32,
    ) -> Result<(), SandboxError> {
        let tmp = tempfile::NamedTempFile::new().map_err(|e| SandboxError::Io(e.to_string()))?;
        tokio::fs::write(tmp.path(), bytes)
            .await
            .map_err(|e| SandboxError::Io(e.to_string()))?;

        let dest = format!("{}:{}", handle.id, path);
        let output = self
            .run_runtime(&["cp", tmp.path().to_str().unwrap_or_default(), dest.as_str()])
            .await?;
        if !output.status.success() {
            return Err(SandboxError::Io(String::from_utf8_lossy(&output.stderr).into_owned()));
        }

        let mode_str = format!("{mode:o}");
        let chmod = self
            .run_runtime(&["exec", handle.id.as_str(), "chmod", mode_str.as_str(), path])
            .await?;
        if !chmod.status.success() {
            return Err(SandboxError::Io(String::from_utf8_lossy(&chmod.stderr).into_owned()));
        }
        Ok(())
    }

    async fn read_file(&self, handle: &SandboxHandle, path: &str) -> Result<Vec<u8>, SandboxError> {
        let tmp_dir = tempfile::tempdir().map_err(|e| SandboxError::Io(e.to_string()))?;
        let local = tmp_dir.path().join("out");
        let src = format!("{}:{}", handle.id, path);

        let output = self
            .run_runtime(&["cp", src.as_str(), local.to_str().unwrap_or_default()])
            .await?;
        if !output.status.success() {
            return Err(SandboxError::Io(String::from_utf8_lossy(&output.stderr).into_owned()));
        }

        tokio::fs::read(&local).await.map_err(|e| SandboxError::Io(e.to_string()))
    }

    async fn list_handles(&self) -> Result<Vec<SandboxHandle>, SandboxError> {
        let output = self
            .run_runtime(&[
                "ps",
                "-a",
                "--filter",
                "name=ai-code-task-",
                "--format",
                "{{.Names}}\t{{.CreatedAt}}",
            ])
            .await?;
        if !output.status.success() {
            return Err(SandboxError::Io(String::from_utf8_lossy(&output.stderr).into_owned()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut handles = Vec::new();
        for line in stdout.lines() {
            let Some((name, created_at)) = line.split_once('\t') else {
                continue;
            };
            let created_at = chrono::DateTime::parse_from_str(created_at.trim(), "%Y-%m-%d %H:%M:%S %z %Z")
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now());
            handles.push(SandboxHandle {
                id: name.to_string(),
                backend: crate::types::Backend::Container,
                created_at,
            });
        }
        Ok(handles)
    }

    async fn teardown(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        let output = self.run_runtime(&["rm", "-f", handle.id.as_str()]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.contains("No such container") {
                tracing::warn!(handle = %handle.id, %stderr, "teardown reported an error");
            }
        }

        let mount = self.workspace_mount(handle);
        if mount.exists() {
            let _ = tokio::fs::remove_dir_all(&mount).await;
        }

        tracing::info!(handle = %handle.id, "sandbox torn down");
        Ok(())
    }
}

/// Returns true if `path` looks like it escapes the sandbox workspace root.
pub fn is_safe_relative_path(path: &str) -> bool {
    !Path::new(path).is_absolute() && !path.split('/').any(|seg| seg == "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_traversal() {
        assert!(!is_safe_relative_path("../../etc/passwd"));
        assert!(!is_safe_relative_path("/etc/passwd"));
        assert!(is_safe_relative_path("src/main.rs"));
    }
}
