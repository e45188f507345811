use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::lock;
use crate::error::QueueError;
use crate::tasks::{EnqueueInfo, TaskEnvelope, TaskLease, TaskQueue, DEFAULT_LEASE_TIMEOUT};

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(1))
}

#[derive(Debug, Default)]
struct QueueState {
    pending: HashMap<String, VecDeque<TaskEnvelope>>,
    active: HashMap<String, (DateTime<Utc>, TaskEnvelope)>,
    scheduled: Vec<(DateTime<Utc>, TaskEnvelope)>,
    archived: Vec<TaskEnvelope>,
    completed: Vec<TaskEnvelope>,
    leases_granted: u64,
}

/// Task queue kept in memory. Retries are parked until their delay has
/// passed or [`InMemoryQueue::release_scheduled`] is called. A lease that
/// is not settled within the lease timeout goes back to pending.
#[derive(Debug)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    unavailable: Mutex<bool>,
    lease_timeout: Duration,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self {
            state: Mutex::default(),
            unavailable: Mutex::default(),
            lease_timeout: DEFAULT_LEASE_TIMEOUT,
        }
    }
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lease_timeout(mut self, lease_timeout: Duration) -> Self {
        self.lease_timeout = lease_timeout;
        self
    }

    /// Tasks currently leased to a worker.
    pub fn active(&self) -> Vec<TaskEnvelope> {
        lock(&self.state)
            .active
            .values()
            .map(|(_, task)| task.clone())
            .collect()
    }

    /// Expire every outstanding lease so its task is handed out again.
    pub fn expire_leases(&self) {
        let mut state = lock(&self.state);
        let expired: Vec<_> = state.active.drain().map(|(_, (_, task))| task).collect();
        for task in expired {
            state.pending.entry(task.queue.clone()).or_default().push_back(task);
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *lock(&self.unavailable) = unavailable;
    }

    pub fn pending(&self, queue: &str) -> Vec<TaskEnvelope> {
        lock(&self.state)
            .pending
            .get(queue)
            .map(|tasks| tasks.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn scheduled(&self) -> Vec<TaskEnvelope> {
        lock(&self.state)
            .scheduled
            .iter()
            .map(|(_, task)| task.clone())
            .collect()
    }

    pub fn archived(&self) -> Vec<TaskEnvelope> {
        lock(&self.state).archived.clone()
    }

    pub fn completed(&self) -> Vec<TaskEnvelope> {
        lock(&self.state).completed.clone()
    }

    /// Make every scheduled retry due immediately.
    pub fn release_scheduled(&self) {
        let mut state = lock(&self.state);
        let released: Vec<_> = state.scheduled.drain(..).collect();
        for (_, task) in released {
            state.pending.entry(task.queue.clone()).or_default().push_back(task);
        }
    }

    fn check_available(&self) -> Result<(), QueueError> {
        if *lock(&self.unavailable) {
            return Err(QueueError::Unavailable("in-memory queue offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for InMemoryQueue {
    async fn enqueue(&self, task: TaskEnvelope) -> Result<EnqueueInfo, QueueError> {
        self.check_available()?;
        let info = EnqueueInfo {
            id: task.id,
            queue: task.queue.clone(),
            max_retry: task.max_retry,
        };
        lock(&self.state)
            .pending
            .entry(task.queue.clone())
            .or_default()
            .push_back(task);
        Ok(info)
    }

    async fn dequeue(&self, queue: &str) -> Result<Option<TaskLease>, QueueError> {
        self.check_available()?;
        let now = Utc::now();
        let mut state = lock(&self.state);

        let (due, waiting): (Vec<_>, Vec<_>) = state
            .scheduled
            .drain(..)
            .partition(|(ready_at, _)| *ready_at <= now);
        state.scheduled = waiting;
        for (_, task) in due {
            state.pending.entry(task.queue.clone()).or_default().push_back(task);
        }

        let expired: Vec<_> = state
            .active
            .iter()
            .filter(|(_, (deadline, _))| *deadline <= now)
            .map(|(receipt, _)| receipt.clone())
            .collect();
        for receipt in expired {
            if let Some((_, task)) = state.active.remove(&receipt) {
                state.pending.entry(task.queue.clone()).or_default().push_back(task);
            }
        }

        let Some(task) = state.pending.get_mut(queue).and_then(VecDeque::pop_front) else {
            return Ok(None);
        };
        state.leases_granted += 1;
        let receipt = format!("{}#{}", task.id, state.leases_granted);
        let deadline = now + to_chrono(self.lease_timeout);
        state.active.insert(receipt.clone(), (deadline, task.clone()));
        Ok(Some(TaskLease { task, receipt }))
    }

    async fn complete(&self, lease: &TaskLease) -> Result<(), QueueError> {
        let mut state = lock(&self.state);
        if let Some((_, task)) = state.active.remove(&lease.receipt) {
            state.completed.push(task);
        }
        Ok(())
    }

    async fn retry(
        &self,
        lease: TaskLease,
        delay: Duration,
        error: &str,
    ) -> Result<(), QueueError> {
        let ready_at = Utc::now() + to_chrono(delay);
        let mut state = lock(&self.state);
        if state.active.remove(&lease.receipt).is_some() {
            state
                .scheduled
                .push((ready_at, lease.task.next_attempt(error)));
        }
        Ok(())
    }

    async fn archive(&self, lease: TaskLease, error: &str) -> Result<(), QueueError> {
        let mut state = lock(&self.state);
        if state.active.remove(&lease.receipt).is_some() {
            state.archived.push(lease.task.failed_with(error));
        }
        Ok(())
    }
}
