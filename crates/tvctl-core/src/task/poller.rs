//! Task status polling

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::progress::ProgressSink;
use super::{Task, TaskState, TaskStatus};
use crate::error::{ApiError, ApiResult};
use crate::gateway::{encode_segment, Target, Transport};

/// Wait between two status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Status polls before giving up (10 minutes at the default interval)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 300;

/// Poll cadence and budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollConfig {
    /// Longest time a wait can take before timing out
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Drives a launched task to a terminal state
pub struct TaskPoller {
    transport: Arc<dyn Transport>,
    status_prefix: String,
    config: PollConfig,
}

impl TaskPoller {
    /// Create a poller for tasks whose status lives at `<status_prefix>/<id>/`
    pub fn new(transport: Arc<dyn Transport>, status_prefix: impl Into<String>) -> Self {
        Self {
            transport,
            status_prefix: status_prefix.into(),
            config: PollConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PollConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    pub fn status_path(&self, task_id: &str) -> String {
        format!(
            "{}/{}/",
            self.status_prefix.trim_end_matches('/'),
            encode_segment(task_id)
        )
    }

    /// Launch a task and wait for its result
    pub async fn start(&self, launch: Target, sink: &dyn ProgressSink) -> ApiResult<Value> {
        let body = self.transport.send(launch).await?;
        let task = Task::from_launch(body)?;
        info!(
            "Task {} launched ({} auth)",
            task.id,
            if task.auth_token.is_some() { "task token" } else { "session" }
        );

        self.wait(task, sink).await
    }

    /// Poll an already launched task until it completes, fails or times out
    ///
    /// Exactly one status request is in flight at a time, and no request is
    /// issued after a terminal state is seen.
    pub async fn wait(&self, mut task: Task, sink: &dyn ProgressSink) -> ApiResult<Value> {
        let max_attempts = self.config.max_attempts;

        for attempt in 1..=max_attempts {
            let status = self.status(&task).await?;
            sink.report(&status);
            task.observe(&status);
            debug!("Task {} poll {}: {:?}", task.id, attempt, task.state);

            match task.state {
                TaskState::Completed => {
                    info!("Task {} completed after {} polls", task.id, attempt);
                    return Ok(task.result.take().unwrap_or(Value::Null));
                }
                TaskState::Failed => {
                    let message = task.error.take().unwrap_or_else(|| "Task failed".to_string());
                    warn!("Task {} failed: {}", task.id, message);
                    return Err(ApiError::TaskFailed(message));
                }
                _ => {}
            }

            if attempt == max_attempts {
                break;
            }
            if sink.is_cancelled() {
                info!("Stopped waiting for task {}", task.id);
                return Err(ApiError::TaskCancelled);
            }
            tokio::time::sleep(self.config.interval).await;
        }

        task.state = TaskState::TimedOut;
        warn!("Task {} timed out after {} polls", task.id, max_attempts);
        Err(ApiError::TaskTimedOut {
            attempts: max_attempts,
        })
    }

    /// Read a task's current status once
    pub async fn status(&self, task: &Task) -> ApiResult<TaskStatus> {
        let target = Target::get(self.status_path(&task.id)).auth(task.auth());
        let body = self.transport.send(target).await?;
        Ok(serde_json::from_value(body)?)
    }
}
