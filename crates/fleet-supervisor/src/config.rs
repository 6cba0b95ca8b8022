use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Size of the bounded worker pool.
    pub worker_concurrency: usize,
    /// Per-user cap, enforced at admission time (not re-checked once a
    /// task is running).
    pub per_user_concurrency: usize,
    pub sweep_interval: Duration,
    pub orphan_age_threshold: Duration,
    /// How long graceful shutdown waits for in-flight tasks to reach a
    /// terminal state before force-tearing down the rest.
    pub drain_deadline: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: 4,
            per_user_concurrency: 2,
            sweep_interval: Duration::from_secs(5 * 60),
            orphan_age_threshold: Duration::from_secs(2 * 60 * 60),
            drain_deadline: Duration::from_secs(60),
        }
    }
}
