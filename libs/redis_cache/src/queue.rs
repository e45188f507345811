//! Redis-backed task queue.
//!
//! Each named queue uses four keys:
//!
//! - `ledger:queue:{name}:pending` list of tasks ready to run
//! - `ledger:queue:{name}:active` sorted set of leased tasks scored by lease deadline (ms)
//! - `ledger:queue:{name}:scheduled` sorted set of retries scored by ready time (ms)
//! - `ledger:queue:{name}:archived` list of tasks that will not run again
//!
//! Tasks are stored as JSON envelopes. Every dequeue first moves due
//! retries and expired leases back to pending, so a task whose worker died
//! is delivered again. A lease receipt is `{deadline}|{envelope}`; settling
//! only succeeds while that exact lease is still held.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::redis::{self, AsyncCommands};
use ledger::tasks::DEFAULT_LEASE_TIMEOUT;
use ledger::{EnqueueInfo, QueueError, TaskEnvelope, TaskLease, TaskQueue};

use crate::{RedisError, RedisPool};

const LEASE_SCRIPT: &str = r#"
local now = tonumber(ARGV[1])
local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', now)
for _, task in ipairs(due) do
    redis.call('ZREM', KEYS[1], task)
    redis.call('RPUSH', KEYS[2], task)
end
local expired = redis.call('ZRANGEBYSCORE', KEYS[3], '-inf', now)
for _, task in ipairs(expired) do
    redis.call('ZREM', KEYS[3], task)
    redis.call('RPUSH', KEYS[2], task)
end
local task = redis.call('LPOP', KEYS[2])
if not task then
    return false
end
redis.call('ZADD', KEYS[3], ARGV[2], task)
return task
"#;

const SETTLE_SCRIPT: &str = r#"
local score = redis.call('ZSCORE', KEYS[1], ARGV[1])
if not score or tonumber(score) ~= tonumber(ARGV[2]) then
    return 0
end
redis.call('ZREM', KEYS[1], ARGV[1])
if ARGV[3] == 'list' then
    redis.call('RPUSH', KEYS[2], ARGV[4])
elseif ARGV[3] == 'zset' then
    redis.call('ZADD', KEYS[2], ARGV[5], ARGV[4])
end
return 1
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueKeys {
    pending: String,
    active: String,
    scheduled: String,
    archived: String,
}

impl QueueKeys {
    fn new(queue: &str) -> Self {
        let prefix = format!("ledger:queue:{queue}");
        Self {
            pending: format!("{prefix}:pending"),
            active: format!("{prefix}:active"),
            scheduled: format!("{prefix}:scheduled"),
            archived: format!("{prefix}:archived"),
        }
    }
}

/// Where a settled lease goes.
enum Settle<'a> {
    Drop,
    Push { key: &'a str, task: String },
    Schedule { key: &'a str, task: String, score: i64 },
}

fn deadline_after(delay: Duration) -> i64 {
    let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
    Utc::now().timestamp_millis().saturating_add(delay_ms)
}

fn lease_receipt(deadline: i64, raw: &str) -> String {
    format!("{deadline}|{raw}")
}

fn parse_receipt(receipt: &str) -> Result<(i64, &str), QueueError> {
    receipt
        .split_once('|')
        .and_then(|(deadline, raw)| Some((deadline.parse().ok()?, raw)))
        .ok_or_else(|| QueueError::Backend("malformed lease receipt".to_string()))
}

pub struct RedisTaskQueue {
    pool: RedisPool,
    lease_timeout: Duration,
    lease: redis::Script,
    settle: redis::Script,
}

impl RedisTaskQueue {
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            lease_timeout: DEFAULT_LEASE_TIMEOUT,
            lease: redis::Script::new(LEASE_SCRIPT),
            settle: redis::Script::new(SETTLE_SCRIPT),
        }
    }

    /// How long a dequeued task stays leased before it is delivered again.
    pub fn with_lease_timeout(mut self, lease_timeout: Duration) -> Self {
        self.lease_timeout = lease_timeout;
        self
    }

    pub async fn pending_length(&self, queue: &str) -> Result<i64, QueueError> {
        let keys = QueueKeys::new(queue);
        let mut conn = self.pool.get().await.map_err(RedisError::from)?;
        let length: i64 = conn.llen(&keys.pending).await.map_err(RedisError::from)?;
        Ok(length)
    }

    pub async fn active_length(&self, queue: &str) -> Result<i64, QueueError> {
        let keys = QueueKeys::new(queue);
        let mut conn = self.pool.get().await.map_err(RedisError::from)?;
        let length: i64 = conn.zcard(&keys.active).await.map_err(RedisError::from)?;
        Ok(length)
    }

    pub async fn archived_length(&self, queue: &str) -> Result<i64, QueueError> {
        let keys = QueueKeys::new(queue);
        let mut conn = self.pool.get().await.map_err(RedisError::from)?;
        let length: i64 = conn.llen(&keys.archived).await.map_err(RedisError::from)?;
        Ok(length)
    }

    async fn try_dequeue(&self, queue: &str) -> Result<Option<TaskLease>, RedisError> {
        let keys = QueueKeys::new(queue);
        let mut conn = self.pool.get().await?;

        loop {
            let deadline = deadline_after(self.lease_timeout);
            let raw: Option<String> = self
                .lease
                .key(&keys.scheduled)
                .key(&keys.pending)
                .key(&keys.active)
                .arg(Utc::now().timestamp_millis())
                .arg(deadline)
                .invoke_async(&mut *conn)
                .await?;
            let Some(raw) = raw else {
                return Ok(None);
            };

            match serde_json::from_str::<TaskEnvelope>(&raw) {
                Ok(task) => {
                    let receipt = lease_receipt(deadline, &raw);
                    return Ok(Some(TaskLease { task, receipt }));
                }
                Err(err) => {
                    tracing::warn!(queue, error = %err, "archiving undecodable task envelope");
                    let _: () = redis::pipe()
                        .atomic()
                        .zrem(&keys.active, &raw)
                        .ignore()
                        .rpush(&keys.archived, &raw)
                        .ignore()
                        .query_async(&mut *conn)
                        .await?;
                }
            }
        }
    }

    async fn settle(&self, lease: &TaskLease, target: Settle<'_>) -> Result<(), QueueError> {
        let keys = QueueKeys::new(&lease.task.queue);
        let (deadline, raw) = parse_receipt(&lease.receipt)?;

        let mut invocation = self.settle.prepare_invoke();
        invocation.key(&keys.active);
        match &target {
            Settle::Drop => {
                invocation.key(&keys.active).arg(raw).arg(deadline).arg("drop");
            }
            Settle::Push { key, task } => {
                invocation.key(*key).arg(raw).arg(deadline).arg("list").arg(task);
            }
            Settle::Schedule { key, task, score } => {
                invocation
                    .key(*key)
                    .arg(raw)
                    .arg(deadline)
                    .arg("zset")
                    .arg(task)
                    .arg(*score);
            }
        }

        let mut conn = self.pool.get().await.map_err(RedisError::from)?;
        let settled: i64 = invocation
            .invoke_async(&mut *conn)
            .await
            .map_err(RedisError::from)?;
        if settled == 0 {
            tracing::debug!(
                task_id = %lease.task.id,
                queue = %lease.task.queue,
                "lease expired before it was settled"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn enqueue(&self, task: TaskEnvelope) -> Result<EnqueueInfo, QueueError> {
        let keys = QueueKeys::new(&task.queue);
        let raw = serde_json::to_string(&task)?;
        let mut conn = self.pool.get().await.map_err(RedisError::from)?;
        let _: i64 = conn.rpush(&keys.pending, raw).await.map_err(RedisError::from)?;

        Ok(EnqueueInfo {
            id: task.id,
            queue: task.queue,
            max_retry: task.max_retry,
        })
    }

    async fn dequeue(&self, queue: &str) -> Result<Option<TaskLease>, QueueError> {
        Ok(self.try_dequeue(queue).await?)
    }

    async fn complete(&self, lease: &TaskLease) -> Result<(), QueueError> {
        self.settle(lease, Settle::Drop).await
    }

    async fn retry(
        &self,
        lease: TaskLease,
        delay: Duration,
        error: &str,
    ) -> Result<(), QueueError> {
        let keys = QueueKeys::new(&lease.task.queue);
        let task = serde_json::to_string(&lease.task.next_attempt(error))?;
        let target = Settle::Schedule {
            key: &keys.scheduled,
            task,
            score: deadline_after(delay),
        };
        self.settle(&lease, target).await
    }

    async fn archive(&self, lease: TaskLease, error: &str) -> Result<(), QueueError> {
        let keys = QueueKeys::new(&lease.task.queue);
        let task = serde_json::to_string(&lease.task.failed_with(error))?;
        let target = Settle::Push {
            key: &keys.archived,
            task,
        };
        self.settle(&lease, target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_per_queue() {
        let keys = QueueKeys::new("critical");
        assert_eq!(keys.pending, "ledger:queue:critical:pending");
        assert_eq!(keys.active, "ledger:queue:critical:active");
        assert_eq!(keys.scheduled, "ledger:queue:critical:scheduled");
        assert_eq!(keys.archived, "ledger:queue:critical:archived");
        assert_ne!(QueueKeys::new("default"), keys);
    }

    #[test]
    fn deadline_is_in_the_future() {
        let now = Utc::now().timestamp_millis();
        let score = deadline_after(Duration::from_secs(10));
        assert!(score >= now + 10_000);
        assert!(score < now + 20_000);
    }

    #[test]
    fn huge_delays_saturate() {
        assert_eq!(deadline_after(Duration::MAX), i64::MAX);
    }

    #[test]
    fn receipt_keeps_envelopes_containing_separators() {
        let raw = r#"{"payload":"a|b"}"#;
        let receipt = lease_receipt(1_718_000_000_000, raw);
        assert_eq!(parse_receipt(&receipt).unwrap(), (1_718_000_000_000, raw));
    }

    #[test]
    fn malformed_receipt_is_rejected() {
        assert!(parse_receipt("no-separator").is_err());
        assert!(parse_receipt("soon|{}").is_err());
    }
}
