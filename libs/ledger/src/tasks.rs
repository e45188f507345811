//! Task envelopes, the queue port and the alert distributor.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::alerts::PayloadAccountAlert;
use crate::error::QueueError;

pub const TASK_SEND_ACCOUNT_ALERT: &str = "send_account_alert";

pub const DEFAULT_QUEUE: &str = "default";
pub const DEFAULT_MAX_RETRY: u32 = 5;
/// How long a worker may hold a task before it is handed out again.
pub const DEFAULT_LEASE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    pub queue: String,
    pub max_retry: u32,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            queue: DEFAULT_QUEUE.to_string(),
            max_retry: DEFAULT_MAX_RETRY,
        }
    }
}

/// Unit stored by the broker. `payload` is kept as raw JSON text so that
/// decoding it is the processor's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub id: Uuid,
    pub task_type: String,
    pub payload: String,
    pub queue: String,
    pub retry_count: u32,
    pub max_retry: u32,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl TaskEnvelope {
    pub fn new(
        task_type: impl Into<String>,
        payload: impl Into<String>,
        opts: &TaskOptions,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_type: task_type.into(),
            payload: payload.into(),
            queue: opts.queue.clone(),
            retry_count: 0,
            max_retry: opts.max_retry,
            enqueued_at: Utc::now(),
            last_error: None,
        }
    }

    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retry
    }

    /// Copy for the next attempt.
    pub fn next_attempt(&self, error: &str) -> Self {
        Self {
            retry_count: self.retry_count.saturating_add(1),
            last_error: Some(error.to_string()),
            ..self.clone()
        }
    }

    pub fn failed_with(&self, error: &str) -> Self {
        Self {
            last_error: Some(error.to_string()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnqueueInfo {
    pub id: Uuid,
    pub queue: String,
    pub max_retry: u32,
}

/// A dequeued task. `receipt` identifies it to the broker until it is
/// completed, retried or archived. A lease left unsettled past the
/// broker's lease timeout expires and the task is delivered again;
/// settling an expired lease is a no-op.
#[derive(Debug, Clone)]
pub struct TaskLease {
    pub task: TaskEnvelope,
    pub receipt: String,
}

/// Durable, at-least-once task broker.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Returns once the broker has durably accepted the task.
    async fn enqueue(&self, task: TaskEnvelope) -> Result<EnqueueInfo, QueueError>;

    async fn dequeue(&self, queue: &str) -> Result<Option<TaskLease>, QueueError>;

    async fn complete(&self, lease: &TaskLease) -> Result<(), QueueError>;

    /// Put the task back after `delay` with its retry count bumped.
    async fn retry(&self, lease: TaskLease, delay: Duration, error: &str)
        -> Result<(), QueueError>;

    /// Move the task to the archived (dead) set for operator inspection.
    async fn archive(&self, lease: TaskLease, error: &str) -> Result<(), QueueError>;
}

#[derive(Clone)]
pub struct TaskDistributor {
    queue: Arc<dyn TaskQueue>,
    options: TaskOptions,
}

impl TaskDistributor {
    pub fn new(queue: Arc<dyn TaskQueue>) -> Self {
        Self {
            queue,
            options: TaskOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TaskOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn distribute_send_account_alert(
        &self,
        payload: &PayloadAccountAlert,
    ) -> Result<EnqueueInfo, QueueError> {
        let json_payload = serde_json::to_string(payload)?;
        let task = TaskEnvelope::new(TASK_SEND_ACCOUNT_ALERT, json_payload, &self.options);
        let task_type = task.task_type.clone();

        let enqueued = self.queue.enqueue(task).await?;

        info!(
            task_type = %task_type,
            task_id = %enqueued.id,
            queue = %enqueued.queue,
            max_retry = enqueued.max_retry,
            account_id = payload.account_id,
            direction = %payload.direction,
            "enqueued task"
        );
        Ok(enqueued)
    }
}
