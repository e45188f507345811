#![allow(dead_code)]

//! Shared setup for tests against a live Redis. Tests run only when
//! `TEST_REDIS_URL` is set; each one works on a queue name of its own.

use std::time::Duration;

use deadpool_redis::redis::AsyncCommands;
use ledger::{TaskEnvelope, TaskOptions, TASK_SEND_ACCOUNT_ALERT};
use redis_cache::{create_pool, RedisPool, RedisTaskQueue};
use uuid::Uuid;

pub struct TestQueue {
    pub pool: RedisPool,
    pub queue: RedisTaskQueue,
    pub name: String,
}

impl TestQueue {
    /// `None` when no test Redis is configured.
    pub async fn connect(lease_timeout: Duration) -> Option<Self> {
        let Ok(url) = std::env::var("TEST_REDIS_URL") else {
            eprintln!("TEST_REDIS_URL not set, skipping Redis test");
            return None;
        };
        let pool = create_pool(&url).await.expect("create pool");
        Some(Self {
            queue: RedisTaskQueue::new(pool.clone()).with_lease_timeout(lease_timeout),
            pool,
            name: format!("test-{}", Uuid::new_v4().simple()),
        })
    }

    pub fn task(&self, max_retry: u32) -> TaskEnvelope {
        let opts = TaskOptions {
            queue: self.name.clone(),
            max_retry,
        };
        TaskEnvelope::new(TASK_SEND_ACCOUNT_ALERT, r#"{"account_id":1}"#, &opts)
    }

    pub fn key(&self, suffix: &str) -> String {
        format!("ledger:queue:{}:{suffix}", self.name)
    }

    pub async fn pending(&self) -> i64 {
        self.queue.pending_length(&self.name).await.unwrap()
    }

    pub async fn active(&self) -> i64 {
        self.queue.active_length(&self.name).await.unwrap()
    }

    pub async fn archived(&self) -> i64 {
        self.queue.archived_length(&self.name).await.unwrap()
    }

    pub async fn scheduled(&self) -> i64 {
        let mut conn = self.pool.get().await.unwrap();
        conn.zcard(self.key("scheduled")).await.unwrap()
    }

    pub async fn cleanup(self) {
        let mut conn = self.pool.get().await.unwrap();
        let keys = ["pending", "active", "scheduled", "archived"].map(|k| self.key(k));
        let _: i64 = conn.del(&keys[..]).await.unwrap();
    }
}
