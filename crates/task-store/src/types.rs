use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Structured reason code attached to a failed task. Mirrors the
/// taxonomy the task runner maps every component error onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Provision,
    CloneAuth,
    CloneNotFound,
    CloneNetwork,
    CloneTimeout,
    AgentExit,
    AgentTimeout,
    NoChanges,
    Commit,
    Orphan,
    Shutdown,
    Internal,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureReason::Provision => "provision",
            FailureReason::CloneAuth => "clone_auth",
            FailureReason::CloneNotFound => "clone_not_found",
            FailureReason::CloneNetwork => "clone_network",
            FailureReason::CloneTimeout => "clone_timeout",
            FailureReason::AgentExit => "agent_exit",
            FailureReason::AgentTimeout => "agent_timeout",
            FailureReason::NoChanges => "no_changes",
            FailureReason::Commit => "commit",
            FailureReason::Orphan => "orphan",
            FailureReason::Shutdown => "shutdown",
            FailureReason::Internal => "internal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }

    /// Whether `self -> next` is an allowed transition (§4.5: monotonic
    /// advance, no skipping except `* -> failed`/`* -> cancelled`).
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (Pending, Running) => true,
            (Running, Completed) => true,
            (_, Failed) | (_, Cancelled) => !self.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Claude,
    Codex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub commit_hash: Option<String>,
    pub unified_diff: Option<String>,
    pub patch_base64: Option<String>,
    pub changed_files: Vec<String>,
    pub exit_code: Option<i32>,
}

impl Default for TaskResult {
    fn default() -> Self {
        Self {
            commit_hash: None,
            unified_diff: None,
            patch_base64: None,
            changed_files: Vec::new(),
            exit_code: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub branch: String,
    pub number: Option<u64>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub repo_url: String,
    pub target_branch: String,
    pub agent_kind: AgentKind,
    pub chat: Vec<ChatMessage>,
    pub status: TaskStatus,
    pub failure_reason: Option<FailureReason>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub sandbox_handle: Option<String>,
    pub result: TaskResult,
    pub pull_request: Option<PullRequestInfo>,
}

/// Fields supplied by the submitter to create a new task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub repo_url: String,
    pub target_branch: String,
    pub agent_kind: AgentKind,
    pub prompt: String,
}

impl Task {
    pub fn from_new(id: TaskId, new: NewTask) -> Self {
        Self {
            id,
            user_id: new.user_id,
            project_id: new.project_id,
            repo_url: new.repo_url,
            target_branch: new.target_branch,
            agent_kind: new.agent_kind,
            chat: vec![ChatMessage::user(new.prompt)],
            status: TaskStatus::Pending,
            failure_reason: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            sandbox_handle: None,
            result: TaskResult::default(),
            pull_request: None,
        }
    }
}

/// Optional filters for [`crate::TaskStore::list_by_user`].
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub project_id: Option<Uuid>,
}
