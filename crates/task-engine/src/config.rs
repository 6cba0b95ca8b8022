//! Typed configuration loaded from a caller-supplied environment map.
//!
//! The core never calls `std::env::var` itself — the embedding HTTP layer
//! reads the real process environment and hands this constructor a map,
//! which keeps config loading testable without mutating global state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use sandbox::{Backend, ResourceLimits};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sandbox_backend: Backend,
    pub sandbox_template: String,
    pub workspace_base: PathBuf,
    pub resource_limits: ResourceLimits,
    pub worker_concurrency: usize,
    pub per_user_concurrency: usize,
    pub orphan_sweep_interval: Duration,
    pub orphan_age_threshold: Duration,
    pub timeout_clone: Duration,
    pub timeout_agent: Duration,
    pub timeout_command: Duration,
    pub timeout_sandbox: Duration,
    pub container_runtime_binary: String,
    pub remote_base_url: String,
    pub remote_api_key: String,
}

fn env_str(map: &HashMap<String, String>, key: &str, default: &str) -> String {
    map.get(key).cloned().unwrap_or_else(|| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(map: &HashMap<String, String>, key: &str, default: T) -> T {
    map.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_duration_secs(map: &HashMap<String, String>, key: &str, default: Duration) -> Duration {
    map.get(key)
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

impl EngineConfig {
    /// Builds a config from an environment-style map, filling in every
    /// field the caller omits with the documented default.
    pub fn from_env_map(map: &HashMap<String, String>) -> Self {
        let sandbox_backend = match map.get("SANDBOX_BACKEND").map(String::as_str) {
            Some("remote") => Backend::Remote,
            _ => Backend::Container,
        };

        let default_limits = ResourceLimits::default();

        Self {
            sandbox_backend,
            sandbox_template: env_str(map, "SANDBOX_TEMPLATE_ID", "default"),
            workspace_base: PathBuf::from(env_str(
                map,
                "WORKSPACE_BASE_PATH",
                std::env::temp_dir().join("task-engine-workspaces").to_string_lossy().as_ref(),
            )),
            resource_limits: ResourceLimits {
                memory_mb: env_parsed(map, "CONTAINER_MEM_LIMIT", default_limits.memory_mb),
                cpu_shares: env_parsed(map, "CONTAINER_CPU_SHARES", default_limits.cpu_shares),
                uid: env_parsed(map, "CONTAINER_UID", default_limits.uid),
                gid: env_parsed(map, "CONTAINER_GID", default_limits.gid),
            },
            worker_concurrency: env_parsed(map, "WORKER_CONCURRENCY", 4),
            per_user_concurrency: env_parsed(map, "PER_USER_CONCURRENCY", 2),
            orphan_sweep_interval: env_duration_secs(map, "ORPHAN_SWEEP_INTERVAL", Duration::from_secs(5 * 60)),
            orphan_age_threshold: env_duration_secs(map, "ORPHAN_AGE_THRESHOLD", Duration::from_secs(2 * 60 * 60)),
            timeout_clone: env_duration_secs(map, "TIMEOUT_CLONE", sandbox::CLONE_TIMEOUT),
            timeout_agent: env_duration_secs(map, "TIMEOUT_AGENT", sandbox::AGENT_TIMEOUT),
            timeout_command: env_duration_secs(map, "TIMEOUT_COMMAND", sandbox::DEFAULT_COMMAND_TIMEOUT),
            timeout_sandbox: env_duration_secs(map, "TIMEOUT_SANDBOX", sandbox::SANDBOX_LIFETIME),
            container_runtime_binary: env_str(map, "CONTAINER_RUNTIME_BINARY", "docker"),
            remote_base_url: env_str(map, "REMOTE_SANDBOX_BASE_URL", ""),
            remote_api_key: env_str(map, "REMOTE_SANDBOX_API_KEY", ""),
        }
    }

    pub fn supervisor_config(&self) -> fleet_supervisor::SupervisorConfig {
        fleet_supervisor::SupervisorConfig {
            worker_concurrency: self.worker_concurrency,
            per_user_concurrency: self.per_user_concurrency,
            sweep_interval: self.orphan_sweep_interval,
            orphan_age_threshold: self.orphan_age_threshold,
            drain_deadline: Duration::from_secs(60),
        }
    }

    pub fn runner_config(&self) -> task_runner::TaskRunnerConfig {
        task_runner::TaskRunnerConfig {
            sandbox_template: self.sandbox_template.clone(),
            resource_limits: self.resource_limits.clone(),
            workspace_base: self.workspace_base.clone(),
            agent_timeout: self.timeout_agent,
            clone_timeout: self.timeout_clone,
        }
    }

    /// Builds the sandbox driver this config selects. Returns a trait
    /// object so the caller never branches on backend again.
    pub fn build_driver(&self) -> std::sync::Arc<dyn sandbox::SandboxDriver> {
        match self.sandbox_backend {
            Backend::Container => {
                std::sync::Arc::new(sandbox::ContainerDriver::new(self.container_runtime_binary.clone(), self.workspace_base.clone()))
            }
            Backend::Remote => std::sync::Arc::new(sandbox::RemoteDriver::new(self.remote_base_url.clone(), self.remote_api_key.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_container_backend() {
        let config = EngineConfig::from_env_map(&HashMap::new());
        assert_eq!(config.sandbox_backend, Backend::Container);
        assert_eq!(config.worker_concurrency, 4);
        assert_eq!(config.per_user_concurrency, 2);
    }

    #[test]
    fn honors_explicit_overrides() {
        let mut map = HashMap::new();
        map.insert("SANDBOX_BACKEND".to_string(), "remote".to_string());
        map.insert("WORKER_CONCURRENCY".to_string(), "16".to_string());
        map.insert("CONTAINER_UID".to_string(), "2000".to_string());

        let config = EngineConfig::from_env_map(&map);
        assert_eq!(config.sandbox_backend, Backend::Remote);
        assert_eq!(config.worker_concurrency, 16);
        assert_eq!(config.resource_limits.uid, 2000);
    }

    #[test]
    fn ignores_unparseable_overrides_and_falls_back_to_default() {
        let mut map = HashMap::new();
        map.insert("WORKER_CONCURRENCY".to_string(), "not-a-number".to_string());
        let config = EngineConfig::from_env_map(&map);
        assert_eq!(config.worker_concurrency, 4);
    }
}
