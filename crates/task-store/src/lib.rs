//! Task state persistence: the [`TaskStore`] trait plus an in-memory
//! reference implementation.
//!
//! The real backend (a durable database) lives outside this crate and
//! implements the same trait; the task runner and fleet supervisor only
//! ever depend on `dyn TaskStore`.

mod error;
mod types;

pub use error::{Result, TaskStoreError};
pub use types::{
    AgentKind, ChatMessage, ChatRole, FailureReason, NewTask, PullRequestInfo, Task, TaskFilter,
    TaskId, TaskResult, TaskStatus,
};

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Fields a status update may change, beyond the status itself. All are
/// optional; `None` leaves the existing value untouched.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub failure_reason: Option<FailureReason>,
    pub error_message: Option<String>,
    pub sandbox_handle: Option<String>,
    pub result: Option<TaskResult>,
    pub pull_request: Option<PullRequestInfo>,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, new: NewTask) -> Result<TaskId>;

    async fn update_status(
        &self,
        task_id: TaskId,
        user_id: Uuid,
        status: TaskStatus,
        fields: StatusUpdate,
    ) -> Result<()>;

    async fn append_chat(&self, task_id: TaskId, user_id: Uuid, message: ChatMessage) -> Result<()>;

    async fn get(&self, task_id: TaskId, user_id: Uuid) -> Result<Task>;

    async fn list_by_user(&self, user_id: Uuid, filter: TaskFilter) -> Result<Vec<Task>>;

    /// Unscoped read, for internal engine use only (the orphan sweeper and
    /// shutdown drain discover tasks by sandbox handle or process-wide
    /// scan, not by an authenticated user). Never reachable from the
    /// external command interface.
    async fn get_any(&self, task_id: TaskId) -> Result<Task>;

    /// Unscoped status update, for the same internal callers as
    /// [`TaskStore::get_any`].
    async fn update_status_any(&self, task_id: TaskId, status: TaskStatus, fields: StatusUpdate) -> Result<()>;
}

/// `Arc<RwLock<HashMap<...>>>`-backed store for tests and single-process
/// deployments. Cloning shares the underlying map, the same way the
/// fleet's other process-wide registries do.
#[derive(Clone)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
    next_id: Arc<AtomicI64>,
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    fn check_owner(task: &Task, user_id: Uuid) -> Result<()> {
        if task.user_id != user_id {
            return Err(TaskStoreError::Unauthorized(task.id));
        }
        Ok(())
    }

    fn apply_status_update(task: &mut Task, status: TaskStatus, fields: StatusUpdate) -> Result<()> {
        if !task.status.can_transition_to(status) {
            return Err(TaskStoreError::InvalidTransition {
                task_id: task.id,
                from: task.status,
                to: status,
            });
        }

        if status == TaskStatus::Running {
            task.started_at = Some(Utc::now());
        }
        if status.is_terminal() {
            task.completed_at = Some(Utc::now());
        }

        task.status = status;
        if let Some(reason) = fields.failure_reason {
            task.failure_reason = Some(reason);
        }
        if let Some(message) = fields.error_message {
            task.error_message = Some(message);
        }
        if let Some(handle) = fields.sandbox_handle {
            task.sandbox_handle = Some(handle);
        }
        if let Some(result) = fields.result {
            task.result = result;
        }
        if let Some(pr) = fields.pull_request {
            task.pull_request = Some(pr);
        }

        tracing::info!(task_id = task.id, status = ?status, "task status updated");
        Ok(())
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, new: NewTask) -> Result<TaskId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task = Task::from_new(id, new);
        tracing::info!(task_id = id, "task created");
        self.tasks.write().await.insert(id, task);
        Ok(id)
    }

    async fn update_status(
        &self,
        task_id: TaskId,
        user_id: Uuid,
        status: TaskStatus,
        fields: StatusUpdate,
    ) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&task_id).ok_or(TaskStoreError::NotFound(task_id))?;
        Self::check_owner(task, user_id)?;
        Self::apply_status_update(task, status, fields)
    }

    async fn append_chat(&self, task_id: TaskId, user_id: Uuid, message: ChatMessage) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&task_id).ok_or(TaskStoreError::NotFound(task_id))?;
        Self::check_owner(task, user_id)?;
        task.chat.push(message);
        Ok(())
    }

    async fn get(&self, task_id: TaskId, user_id: Uuid) -> Result<Task> {
        let tasks = self.tasks.read().await;
        let task = tasks.get(&task_id).ok_or(TaskStoreError::NotFound(task_id))?;
        Self::check_owner(task, user_id)?;
        Ok(task.clone())
    }

    async fn list_by_user(&self, user_id: Uuid, filter: TaskFilter) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .values()
            .filter(|t| t.user_id == user_id)
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .filter(|t| filter.project_id.is_none() || t.project_id == filter.project_id)
            .cloned()
            .collect())
    }

    async fn get_any(&self, task_id: TaskId) -> Result<Task> {
        let tasks = self.tasks.read().await;
        tasks.get(&task_id).cloned().ok_or(TaskStoreError::NotFound(task_id))
    }

    async fn update_status_any(&self, task_id: TaskId, status: TaskStatus, fields: StatusUpdate) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&task_id).ok_or(TaskStoreError::NotFound(task_id))?;
        Self::apply_status_update(task, status, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(user_id: Uuid) -> NewTask {
        NewTask {
            user_id,
            project_id: None,
            repo_url: "https://github.com/acme/widgets".to_string(),
            target_branch: "main".to_string(),
            agent_kind: AgentKind::Claude,
            prompt: "Fix the bug.".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_get_round_trips() {
        let store = InMemoryTaskStore::new();
        let user_id = Uuid::new_v4();
        let id = store.create(sample_task(user_id)).await.unwrap();

        let task = store.get(id, user_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.chat.len(), 1);
        assert_eq!(task.chat[0].role, ChatRole::User);
    }

    #[tokio::test]
    async fn get_rejects_cross_user_access() {
        let store = InMemoryTaskStore::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let id = store.create(sample_task(owner)).await.unwrap();

        let err = store.get(id, other).await.unwrap_err();
        assert!(matches!(err, TaskStoreError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn status_transitions_are_monotonic() {
        let store = InMemoryTaskStore::new();
        let user_id = Uuid::new_v4();
        let id = store.create(sample_task(user_id)).await.unwrap();

        store
            .update_status(id, user_id, TaskStatus::Running, StatusUpdate::default())
            .await
            .unwrap();

        let err = store
            .update_status(id, user_id, TaskStatus::Pending, StatusUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskStoreError::InvalidTransition { .. }));

        store
            .update_status(id, user_id, TaskStatus::Completed, StatusUpdate::default())
            .await
            .unwrap();

        let task = store.get(id, user_id).await.unwrap();
        assert!(task.started_at.is_some());
        assert!(task.completed_at.is_some());
    }

    #[tokio::test]
    async fn terminal_state_rejects_further_transitions() {
        let store = InMemoryTaskStore::new();
        let user_id = Uuid::new_v4();
        let id = store.create(sample_task(user_id)).await.unwrap();

        store
            .update_status(id, user_id, TaskStatus::Running, StatusUpdate::default())
            .await
            .unwrap();
        store
            .update_status(
                id,
                user_id,
                TaskStatus::Failed,
                StatusUpdate {
                    failure_reason: Some(FailureReason::Internal),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = store
            .update_status(id, user_id, TaskStatus::Cancelled, StatusUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskStoreError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn append_chat_is_ordered() {
        let store = InMemoryTaskStore::new();
        let user_id = Uuid::new_v4();
        let id = store.create(sample_task(user_id)).await.unwrap();

        store.append_chat(id, user_id, ChatMessage::assistant("working on it")).await.unwrap();
        store.append_chat(id, user_id, ChatMessage::assistant("done")).await.unwrap();

        let task = store.get(id, user_id).await.unwrap();
        assert_eq!(task.chat.len(), 3);
        assert_eq!(task.chat[1].content, "working on it");
        assert_eq!(task.chat[2].content, "done");
    }

    #[tokio::test]
    async fn list_by_user_filters_by_status() {
        let store = InMemoryTaskStore::new();
        let user_id = Uuid::new_v4();
        let a = store.create(sample_task(user_id)).await.unwrap();
        let _b = store.create(sample_task(user_id)).await.unwrap();

        store
            .update_status(a, user_id, TaskStatus::Running, StatusUpdate::default())
            .await
            .unwrap();

        let running = store
            .list_by_user(
                user_id,
                TaskFilter {
                    status: Some(TaskStatus::Running),
                    project_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, a);
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let store = InMemoryTaskStore::new();
        let clone = store.clone();
        let user_id = Uuid::new_v4();
        let id = store.create(sample_task(user_id)).await.unwrap();

        let task = clone.get(id, user_id).await.unwrap();
        assert_eq!(task.id, id);
    }
}
