//! Ledger core: transfer booking, daily limits and balance alerts.
//!
//! Storage, queueing and notification delivery are reached through the
//! ports in [`store`], [`tasks`] and [`processor`]; the Postgres and Redis
//! adapters live in their own crates.

pub mod alerts;
pub mod clock;
pub mod error;
pub mod executor;
pub mod limit;
pub mod models;
pub mod processor;
pub mod service;
pub mod store;
pub mod tasks;
pub mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use alerts::{detect_crossings, AlertDirection, PayloadAccountAlert};
pub use clock::{Clock, SystemClock};
pub use error::{DeliveryError, LedgerError, ProcessError, QueueError, StoreError};
pub use models::{
    Account, AccountAlert, AccountLimit, Entry, NewEntry, NewTransfer, Transfer, TransferRequest,
    TransferTxResult, UpsertAccountAlert, UpsertAccountLimit, User,
};
pub use processor::{render_account_alert, Mailer, Notification, TaskProcessor};
pub use service::{AlertDispatchReport, TransferOutcome, TransferService};
pub use store::{AccountStore, BookingUnit, UserStore};
pub use tasks::{
    EnqueueInfo, TaskDistributor, TaskEnvelope, TaskLease, TaskOptions, TaskQueue,
    TASK_SEND_ACCOUNT_ALERT,
};
pub use worker::{Disposition, RetryPolicy, TaskRunner};

pub type LedgerResult<T> = Result<T, LedgerError>;
