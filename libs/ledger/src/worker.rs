//! Queue draining loop and retry policy.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::error::{ProcessError, QueueError};
use crate::processor::TaskProcessor;
use crate::tasks::{TaskEnvelope, TaskQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(3600),
        }
    }
}

impl RetryPolicy {
    /// `base_delay * 2^retry_count`, capped at `max_delay`.
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let factor = 2u32.checked_pow(retry_count).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    pub fn decide(&self, task: &TaskEnvelope, outcome: &Result<(), ProcessError>) -> Disposition {
        match outcome {
            Ok(()) => Disposition::Completed,
            Err(err @ ProcessError::Permanent(_)) => Disposition::Archived {
                reason: err.to_string(),
            },
            Err(err) if task.retries_exhausted() => Disposition::Archived {
                reason: format!("retries exhausted: {err}"),
            },
            Err(err) => Disposition::Retry {
                delay: self.backoff(task.retry_count),
                reason: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Completed,
    Retry { delay: Duration, reason: String },
    Archived { reason: String },
}

pub struct TaskRunner {
    queue: Arc<dyn TaskQueue>,
    processor: TaskProcessor,
    policy: RetryPolicy,
    queue_name: String,
}

impl TaskRunner {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        processor: TaskProcessor,
        queue_name: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            processor,
            policy: RetryPolicy::default(),
            queue_name: queue_name.into(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Lease one task, process it and settle it on the queue. `None` when
    /// the queue was empty.
    pub async fn run_once(&self) -> Result<Option<Disposition>, QueueError> {
        let Some(lease) = self.queue.dequeue(&self.queue_name).await? else {
            return Ok(None);
        };

        let outcome = self.processor.process(&lease.task).await;
        let disposition = self.policy.decide(&lease.task, &outcome);

        match &disposition {
            Disposition::Completed => {
                self.queue.complete(&lease).await?;
            }
            Disposition::Retry { delay, reason } => {
                warn!(
                    task_id = %lease.task.id,
                    task_type = %lease.task.task_type,
                    retry_count = lease.task.retry_count,
                    delay_secs = delay.as_secs(),
                    error = %reason,
                    "task failed, scheduling retry"
                );
                self.queue.retry(lease, *delay, reason).await?;
            }
            Disposition::Archived { reason } => {
                error!(
                    task_id = %lease.task.id,
                    task_type = %lease.task.task_type,
                    retry_count = lease.task.retry_count,
                    error = %reason,
                    "task archived"
                );
                self.queue.archive(lease, reason).await?;
            }
        }

        Ok(Some(disposition))
    }

    /// Drain the queue with `concurrency` independent loops until
    /// `shutdown` turns true or its sender goes away.
    pub async fn run(
        self: Arc<Self>,
        concurrency: usize,
        poll_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) {
        let mut workers = JoinSet::new();

        for worker_id in 0..concurrency.max(1) {
            let runner = Arc::clone(&self);
            let mut shutdown = shutdown.clone();

            workers.spawn(async move {
                loop {
                    if *shutdown.borrow() {
                        break;
                    }

                    match runner.run_once().await {
                        Ok(Some(_)) => continue,
                        Ok(None) => {}
                        Err(err) => {
                            warn!(worker_id, error = %err, "failed to poll task queue");
                        }
                    }

                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(poll_interval) => {}
                    }
                }
                debug!(worker_id, "worker stopped");
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "worker task panicked");
            }
        }
    }
}
