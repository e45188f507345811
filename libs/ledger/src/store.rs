use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{LedgerError, StoreError};
use crate::models::{
    Account, AccountAlert, AccountLimit, Entry, NewEntry, NewTransfer, Transfer, TransferRequest,
    TransferTxResult, UpsertAccountAlert, UpsertAccountLimit, User,
};

/// Operations available inside one atomic booking.
///
/// Implementations hold whatever makes the unit atomic (a database
/// transaction, a set of account locks). Dropping the unit without
/// committing must discard every change made through it.
#[async_trait]
pub trait BookingUnit: Send {
    /// Read an account and hold its mutation lock until the unit ends.
    async fn lock_account(&mut self, id: i64) -> Result<Option<Account>, StoreError>;

    async fn account_limit(&mut self, account_id: i64) -> Result<Option<AccountLimit>, StoreError>;

    /// Sum of outgoing transfer amounts with `from <= created_at < to`.
    async fn sum_outgoing_transfers(
        &mut self,
        account_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Apply a signed delta to a locked account and return the new row.
    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, StoreError>;

    async fn insert_transfer(&mut self, transfer: NewTransfer) -> Result<Transfer, StoreError>;

    async fn insert_entry(&mut self, entry: NewEntry) -> Result<Entry, StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError>;

    async fn get_account_limit(&self, account_id: i64) -> Result<Option<AccountLimit>, StoreError>;

    async fn get_account_alert(&self, account_id: i64) -> Result<Option<AccountAlert>, StoreError>;

    async fn sum_outgoing_transfers(
        &self,
        account_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    async fn upsert_account_limit(
        &self,
        params: UpsertAccountLimit,
    ) -> Result<AccountLimit, StoreError>;

    async fn upsert_account_alert(
        &self,
        params: UpsertAccountAlert,
    ) -> Result<AccountAlert, StoreError>;

    /// Run [`crate::executor::book`] inside this store's atomic unit and
    /// commit only when it succeeds.
    async fn transfer_tx(
        &self,
        request: TransferRequest,
        now: DateTime<Utc>,
    ) -> Result<TransferTxResult, LedgerError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError>;
}
