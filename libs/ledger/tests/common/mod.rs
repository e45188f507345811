#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use ledger::clock::ManualClock;
use ledger::memory::{InMemoryQueue, InMemoryStore, RecordingMailer};
use ledger::{
    Account, TaskDistributor, TaskOptions, TaskProcessor, TaskRunner, TransferService,
    UpsertAccountAlert, UpsertAccountLimit,
};

pub const QUEUE: &str = "alerts";

pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap()
}

/// Service wired to in-memory adapters with a clock pinned to [`noon`].
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub queue: Arc<InMemoryQueue>,
    pub mailer: Arc<RecordingMailer>,
    pub clock: Arc<ManualClock>,
    pub service: Arc<TransferService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(TaskOptions {
            queue: QUEUE.to_string(),
            max_retry: 3,
        })
    }

    pub fn with_options(options: TaskOptions) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let queue = Arc::new(InMemoryQueue::new());
        let mailer = Arc::new(RecordingMailer::new());
        let clock = Arc::new(ManualClock::new(noon()));

        let distributor = TaskDistributor::new(queue.clone()).with_options(options);
        let service = TransferService::new(store.clone())
            .with_distributor(distributor)
            .with_clock(clock.clone());

        Self {
            store,
            queue,
            mailer,
            clock,
            service: Arc::new(service),
        }
    }

    pub fn runner(&self) -> TaskRunner {
        let processor = TaskProcessor::new(self.store.clone(), self.mailer.clone());
        TaskRunner::new(self.queue.clone(), processor, QUEUE)
    }

    pub fn account(&self, owner: &str, balance: i64) -> Account {
        self.store.create_user(owner, &format!("{owner} Example"), &format!("{owner}@example.com"));
        self.store.create_account(owner, balance, "USD")
    }

    pub fn balance(&self, id: i64) -> i64 {
        self.store.account(id).expect("account exists").balance
    }

    pub async fn set_limit(&self, account_id: i64, daily_transfer_limit: i64) {
        self.service
            .upsert_account_limit(UpsertAccountLimit {
                account_id,
                daily_transfer_limit,
            })
            .await
            .expect("limit upsert succeeds");
    }

    pub async fn set_alert(&self, account_id: i64, low: i64, high: i64) {
        self.service
            .upsert_account_alert(UpsertAccountAlert {
                account_id,
                low_balance_threshold: low,
                high_balance_threshold: high,
            })
            .await
            .expect("alert upsert succeeds");
    }
}
