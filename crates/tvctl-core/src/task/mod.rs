//! Long-running server tasks
//!
//! Some operations (backup creation, backup restore) run asynchronously on
//! the service. The launch endpoint answers immediately with a task id and,
//! when the task may invalidate the caller's session, a task-scoped token.
//! The [`TaskPoller`] then polls the task's status until it reaches a
//! terminal state or the poll budget runs out.
//!
//! ## States
//!
//! ```text
//! pending -> running -> completed
//!                    \-> failed
//! (client only)  any non-terminal -> timed-out
//! ```

mod poller;
mod progress;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiResult;
use crate::gateway::Auth;

pub use poller::{PollConfig, TaskPoller, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};
pub use progress::{ChannelProgress, NoProgress, ProgressSink};

/// Lifecycle state of a server task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "Option<String>")]
pub enum TaskState {
    Pending,
    /// Also used when the service omits the state
    #[default]
    Running,
    Completed,
    Failed,
    /// Set by the client when the poll budget is exhausted
    TimedOut,
}

impl From<String> for TaskState {
    /// Unrecognized states are treated as still running
    fn from(state: String) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "pending" => TaskState::Pending,
            "completed" => TaskState::Completed,
            "failed" => TaskState::Failed,
            "timed-out" => TaskState::TimedOut,
            _ => TaskState::Running,
        }
    }
}

impl From<Option<String>> for TaskState {
    fn from(state: Option<String>) -> Self {
        state.map(TaskState::from).unwrap_or_default()
    }
}

impl TaskState {
    /// Completed or failed; polling stops here
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// One status payload read from the task status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Any other fields (progress, messages) as sent by the service
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            result: None,
            error: None,
            extra: Map::new(),
        }
    }

    /// Progress value, when the service reports one
    pub fn progress(&self) -> Option<f64> {
        self.extra.get("progress").and_then(Value::as_f64)
    }

    /// Human-readable status message, when the service reports one
    pub fn message(&self) -> Option<&str> {
        self.extra.get("message").and_then(Value::as_str)
    }
}

/// Launch endpoint response
#[derive(Debug, Deserialize)]
struct LaunchResponse {
    task_id: String,
    #[serde(default)]
    task_token: Option<String>,
}

/// A task being tracked by the client
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    /// Single-use credential scoped to this task
    pub auth_token: Option<String>,
    pub state: TaskState,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            id: id.into(),
            auth_token,
            state: TaskState::Pending,
            result: None,
            error: None,
        }
    }

    /// Build a task from the launch endpoint's `{task_id, task_token}` body
    pub fn from_launch(body: Value) -> ApiResult<Self> {
        let launch: LaunchResponse = serde_json::from_value(body)?;
        Ok(Self::new(launch.task_id, launch.task_token))
    }

    /// Credentials for status polls: the task token when there is one
    pub fn auth(&self) -> Auth {
        match &self.auth_token {
            Some(token) => Auth::TaskToken(token.clone()),
            None => Auth::Session,
        }
    }

    /// Record a status read
    pub fn observe(&mut self, status: &TaskStatus) {
        self.state = status.state;
        if status.result.is_some() {
            self.result = status.result.clone();
        }
        if status.error.is_some() {
            self.error = status.error.clone();
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
