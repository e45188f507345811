mod common;

use std::time::Duration;

use common::TestQueue;
use deadpool_redis::redis::AsyncCommands;
use ledger::tasks::DEFAULT_LEASE_TIMEOUT;
use ledger::{TaskEnvelope, TaskQueue};

#[tokio::test]
async fn complete_removes_the_lease() {
    let Some(q) = TestQueue::connect(DEFAULT_LEASE_TIMEOUT).await else {
        return;
    };
    let task = q.task(3);
    let info = q.queue.enqueue(task.clone()).await.unwrap();
    assert_eq!(info.id, task.id);
    assert_eq!(q.pending().await, 1);

    let lease = q.queue.dequeue(&q.name).await.unwrap().unwrap();
    assert_eq!(lease.task, task);
    assert_eq!(q.pending().await, 0);
    assert_eq!(q.active().await, 1);

    q.queue.complete(&lease).await.unwrap();
    assert_eq!(q.active().await, 0);
    assert!(q.queue.dequeue(&q.name).await.unwrap().is_none());

    q.cleanup().await;
}

#[tokio::test]
async fn retry_is_promoted_and_then_archived() {
    let Some(q) = TestQueue::connect(DEFAULT_LEASE_TIMEOUT).await else {
        return;
    };
    let task = q.task(1);
    q.queue.enqueue(task.clone()).await.unwrap();

    let lease = q.queue.dequeue(&q.name).await.unwrap().unwrap();
    q.queue.retry(lease, Duration::ZERO, "smtp down").await.unwrap();
    assert_eq!(q.active().await, 0);
    assert_eq!(q.scheduled().await, 1);

    let lease = q.queue.dequeue(&q.name).await.unwrap().unwrap();
    assert_eq!(lease.task.id, task.id);
    assert_eq!(lease.task.retry_count, 1);
    assert_eq!(lease.task.last_error.as_deref(), Some("smtp down"));
    assert!(lease.task.retries_exhausted());
    assert_eq!(q.scheduled().await, 0);

    q.queue.archive(lease, "smtp still down").await.unwrap();
    assert_eq!(q.active().await, 0);
    assert_eq!(q.archived().await, 1);
    assert!(q.queue.dequeue(&q.name).await.unwrap().is_none());

    let mut conn = q.pool.get().await.unwrap();
    let raw: String = conn.lindex(q.key("archived"), 0).await.unwrap();
    let archived: TaskEnvelope = serde_json::from_str(&raw).unwrap();
    assert_eq!(archived.id, task.id);
    assert_eq!(archived.last_error.as_deref(), Some("smtp still down"));
    drop(conn);

    q.cleanup().await;
}

#[tokio::test]
async fn delayed_retry_is_not_handed_out_early() {
    let Some(q) = TestQueue::connect(DEFAULT_LEASE_TIMEOUT).await else {
        return;
    };
    q.queue.enqueue(q.task(3)).await.unwrap();

    let lease = q.queue.dequeue(&q.name).await.unwrap().unwrap();
    q.queue
        .retry(lease, Duration::from_secs(60), "later")
        .await
        .unwrap();

    assert!(q.queue.dequeue(&q.name).await.unwrap().is_none());
    assert_eq!(q.pending().await, 0);
    assert_eq!(q.scheduled().await, 1);

    q.cleanup().await;
}

#[tokio::test]
async fn expired_lease_is_handed_out_again() {
    let Some(q) = TestQueue::connect(Duration::from_millis(50)).await else {
        return;
    };
    let task = q.task(3);
    q.queue.enqueue(task.clone()).await.unwrap();

    let stale = q.queue.dequeue(&q.name).await.unwrap().unwrap();
    assert!(q.queue.dequeue(&q.name).await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(100)).await;
    let current = q.queue.dequeue(&q.name).await.unwrap().unwrap();
    assert_eq!(current.task.id, task.id);
    assert_ne!(current.receipt, stale.receipt);
    assert_eq!(q.active().await, 1);

    // The stale holder no longer owns the task.
    q.queue.complete(&stale).await.unwrap();
    assert_eq!(q.active().await, 1);
    q.queue.retry(stale, Duration::ZERO, "late").await.unwrap();
    assert_eq!(q.scheduled().await, 0);

    q.queue.complete(&current).await.unwrap();
    assert_eq!(q.active().await, 0);
    assert_eq!(q.pending().await, 0);

    q.cleanup().await;
}

#[tokio::test]
async fn undecodable_envelope_is_archived() {
    let Some(q) = TestQueue::connect(DEFAULT_LEASE_TIMEOUT).await else {
        return;
    };
    let mut conn = q.pool.get().await.unwrap();
    let _: i64 = conn.rpush(q.key("pending"), "not an envelope").await.unwrap();
    drop(conn);
    let task = q.task(3);
    q.queue.enqueue(task.clone()).await.unwrap();

    let lease = q.queue.dequeue(&q.name).await.unwrap().unwrap();
    assert_eq!(lease.task.id, task.id);
    assert_eq!(q.archived().await, 1);
    assert_eq!(q.active().await, 1);

    q.queue.complete(&lease).await.unwrap();
    q.cleanup().await;
}
