//! Fleet-wide concurrency control: a bounded worker pool with a per-user
//! admission cap, a periodic orphan sweep, and a graceful shutdown drain.

mod config;
mod error;

pub use config::SupervisorConfig;
pub use error::SupervisorError;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use task_runner::{RunRequest, TaskRunner};
use task_store::{TaskId, TaskStore};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

const HANDLE_PREFIX: &str = "ai-code-task-";

fn task_id_from_handle(handle_id: &str) -> Option<TaskId> {
    handle_id.strip_prefix(HANDLE_PREFIX)?.parse().ok()
}

struct AdmissionGuard {
    user_id: Uuid,
    per_user_counts: Arc<Mutex<HashMap<Uuid, usize>>>,
    _permit: tokio::sync::OwnedSemaphorePermit,
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        let counts = self.per_user_counts.clone();
        let user_id = self.user_id;
        tokio::spawn(async move {
            let mut counts = counts.lock().await;
            if let Some(count) = counts.get_mut(&user_id) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    counts.remove(&user_id);
                }
            }
        });
    }
}

pub struct FleetSupervisor {
    store: Arc<dyn TaskStore>,
    driver: Arc<dyn sandbox::SandboxDriver>,
    runner: Arc<TaskRunner>,
    config: SupervisorConfig,
    semaphore: Arc<Semaphore>,
    per_user_counts: Arc<Mutex<HashMap<Uuid, usize>>>,
    shutting_down: Arc<AtomicBool>,
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl FleetSupervisor {
    pub fn new(
        store: Arc<dyn TaskStore>,
        driver: Arc<dyn sandbox::SandboxDriver>,
        runner: Arc<TaskRunner>,
        config: SupervisorConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            driver,
            semaphore: Arc::new(Semaphore::new(config.worker_concurrency)),
            per_user_counts: Arc::new(Mutex::new(HashMap::new())),
            shutting_down: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(Mutex::new(Vec::new())),
            runner,
            config,
        })
    }

    /// Admits `request` into the pool: blocks in FIFO order until a
    /// global worker slot and the submitting user's per-user slot are
    /// both available, then spawns the run and returns immediately. The
    /// per-user cap is only checked here, at admission — not re-checked
    /// once the task is running.
    pub async fn submit(self: &Arc<Self>, request: RunRequest) -> Result<(), SupervisorError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(SupervisorError::ShuttingDown);
        }

        let user_id = request.user_id;
        let guard = self.admit(user_id).await?;

        let this = self.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            this.runner.run(request).await.ok();
        });

        self.in_flight.lock().await.push(handle);
        self.reap_finished().await;
        Ok(())
    }

    async fn admit(self: &Arc<Self>, user_id: Uuid) -> Result<AdmissionGuard, SupervisorError> {
        loop {
            if self.shutting_down.load(Ordering::SeqCst) {
                return Err(SupervisorError::ShuttingDown);
            }

            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("semaphore is never closed while the supervisor is alive");

            let mut counts = self.per_user_counts.lock().await;
            let count = counts.entry(user_id).or_insert(0);
            if *count < self.config.per_user_concurrency {
                *count += 1;
                drop(counts);
                return Ok(AdmissionGuard {
                    user_id,
                    per_user_counts: self.per_user_counts.clone(),
                    _permit: permit,
                });
            }
            drop(counts);
            drop(permit);
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }

    async fn reap_finished(&self) {
        let mut in_flight = self.in_flight.lock().await;
        in_flight.retain(|h| !h.is_finished());
    }

    /// Runs one orphan-sweep pass: any sandbox named with the engine's
    /// prefix whose age exceeds the configured threshold is torn down
    /// and, if a matching running task exists, marked `failed{orphan}`.
    pub async fn sweep_once(&self) {
        let handles = match self.driver.list_handles().await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(error = %e, "orphan sweep failed to list sandboxes");
                return;
            }
        };

        let now = chrono::Utc::now();
        for handle in handles {
            if !handle.id.starts_with(HANDLE_PREFIX) {
                continue;
            }
            let age = now.signed_duration_since(handle.created_at);
            if age.to_std().unwrap_or_default() < self.config.orphan_age_threshold {
                continue;
            }

            tracing::info!(handle = %handle.id, "sweeping orphaned sandbox");
            if let Err(e) = self.driver.teardown(&handle).await {
                tracing::warn!(handle = %handle.id, error = %e, "failed to tear down orphaned sandbox");
                continue;
            }

            if let Some(task_id) = task_id_from_handle(&handle.id) {
                if let Ok(task) = self.store.get_any(task_id).await {
                    if !task.status.is_terminal() {
                        task_runner::mark_orphan(self.store.as_ref(), task_id).await;
                    }
                }
            }
        }
    }

    /// Spawns the periodic sweeper loop. Returns its join handle so the
    /// caller can await it during shutdown if desired.
    pub fn spawn_orphan_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.config.sweep_interval);
            loop {
                interval.tick().await;
                if this.shutting_down.load(Ordering::SeqCst) {
                    break;
                }
                this.sweep_once().await;
            }
        })
    }

    /// Stops admitting new tasks, waits up to `drain_deadline` for
    /// in-flight runs to reach a terminal state on their own, then force
    /// tears down whatever sandboxes remain and marks their tasks
    /// `failed{shutdown}`.
    pub async fn shutdown(self: &Arc<Self>) {
        self.shutting_down.store(true, Ordering::SeqCst);
        tracing::info!("fleet supervisor draining");

        let deadline = tokio::time::Instant::now() + self.config.drain_deadline;
        loop {
            self.reap_finished().await;
            if self.in_flight.lock().await.is_empty() || tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }

        let remaining: Vec<JoinHandle<()>> = self.in_flight.lock().await.drain(..).collect();
        if !remaining.is_empty() {
            tracing::warn!(count = remaining.len(), "force-tearing down sandboxes that missed the drain deadline");
            for h in remaining {
                h.abort();
            }
            if let Ok(handles) = self.driver.list_handles().await {
                for handle in handles {
                    if handle.id.starts_with(HANDLE_PREFIX) {
                        let _ = self.driver.teardown(&handle).await;
                        if let Some(task_id) = task_id_from_handle(&handle.id) {
                            if let Ok(task) = self.store.get_any(task_id).await {
                                if !task.status.is_terminal() {
                                    task_runner::mark_shutdown(self.store.as_ref(), task_id).await;
                                }
                            }
                        }
                    }
                }
            }
        }

        tracing::info!("fleet supervisor shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_task_id_from_handle_name() {
        assert_eq!(task_id_from_handle("ai-code-task-42"), Some(42));
        assert_eq!(task_id_from_handle("something-else"), None);
        assert_eq!(task_id_from_handle("ai-code-task-not-a-number"), None);
    }

    #[test]
    fn default_config_has_sane_bounds() {
        let config = SupervisorConfig::default();
        assert!(config.worker_concurrency > 0);
        assert!(config.per_user_concurrency > 0);
        assert!(config.per_user_concurrency <= config.worker_concurrency * 4);
    }
}
