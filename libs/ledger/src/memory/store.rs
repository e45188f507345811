use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;

use super::lock;
use crate::error::{LedgerError, StoreError};
use crate::executor;
use crate::models::{
    Account, AccountAlert, AccountLimit, Entry, NewEntry, NewTransfer, Transfer, TransferRequest,
    TransferTxResult, UpsertAccountAlert, UpsertAccountLimit, User,
};
use crate::store::{AccountStore, BookingUnit, UserStore};

/// Where an injected storage failure strikes inside a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// After the source account is debited, before the credit.
    BeforeCredit,
    /// After both balances moved, before the transfer row is written.
    BeforeRecords,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<String, User>,
    accounts: BTreeMap<i64, Account>,
    limits: HashMap<i64, AccountLimit>,
    alerts: HashMap<i64, AccountAlert>,
    transfers: Vec<Transfer>,
    entries: Vec<Entry>,
    next_account_id: i64,
    next_transfer_id: i64,
    next_entry_id: i64,
}

impl State {
    fn sum_outgoing(&self, account_id: i64, from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
        sum_outgoing(&self.transfers, account_id, from, to)
    }
}

fn sum_outgoing(
    transfers: &[Transfer],
    account_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> i64 {
    transfers
        .iter()
        .filter(|t| t.from_account_id == account_id && t.created_at >= from && t.created_at < to)
        .map(|t| t.amount)
        .sum()
}

/// Store that keeps every table in memory.
///
/// Committed state sits behind one mutex; bookings stage their writes and
/// hold a per-account async lock for each account they touch, so
/// transfers on disjoint accounts do not wait on each other.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    account_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
    fail_point: Mutex<Option<FailPoint>>,
    unavailable: Mutex<bool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_user(&self, username: &str, full_name: &str, email: &str) -> User {
        let user = User {
            username: username.to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        lock(&self.state)
            .users
            .insert(user.username.clone(), user.clone());
        user
    }

    pub fn create_account(&self, owner: &str, balance: i64, currency: &str) -> Account {
        let mut state = lock(&self.state);
        state.next_account_id += 1;
        let account = Account {
            id: state.next_account_id,
            owner: owner.to_string(),
            balance,
            currency: currency.to_string(),
            created_at: Utc::now(),
        };
        state.accounts.insert(account.id, account.clone());
        account
    }

    pub fn delete_account(&self, id: i64) {
        lock(&self.state).accounts.remove(&id);
    }

    /// Fail the next booking at `point`; the failure is consumed once hit.
    pub fn fail_next_booking(&self, point: FailPoint) {
        *lock(&self.fail_point) = Some(point);
    }

    /// Make every read and booking fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        *lock(&self.unavailable) = unavailable;
    }

    pub fn account(&self, id: i64) -> Option<Account> {
        lock(&self.state).accounts.get(&id).cloned()
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        lock(&self.state).transfers.clone()
    }

    pub fn entries(&self) -> Vec<Entry> {
        lock(&self.state).entries.clone()
    }

    pub fn total_balance(&self) -> i64 {
        lock(&self.state).accounts.values().map(|a| a.balance).sum()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if *lock(&self.unavailable) {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(())
    }

    fn account_lock(&self, id: i64) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(lock(&self.account_locks).entry(id).or_default())
    }
}

struct MemoryBookingUnit<'a> {
    store: &'a InMemoryStore,
    guards: Vec<OwnedMutexGuard<()>>,
    accounts: BTreeMap<i64, Account>,
    transfers: Vec<Transfer>,
    entries: Vec<Entry>,
    fail_point: Option<FailPoint>,
}

impl<'a> MemoryBookingUnit<'a> {
    fn begin(store: &'a InMemoryStore) -> Self {
        Self {
            store,
            guards: Vec::new(),
            accounts: BTreeMap::new(),
            transfers: Vec::new(),
            entries: Vec::new(),
            fail_point: lock(&store.fail_point).take(),
        }
    }

    fn injected(&self, point: FailPoint) -> Result<(), StoreError> {
        if self.fail_point == Some(point) {
            return Err(StoreError::Unavailable(format!(
                "injected failure at {point:?}"
            )));
        }
        Ok(())
    }

    /// Publish the staged writes. Account locks are released afterwards,
    /// when `self` drops.
    fn commit(self) {
        let mut state = lock(&self.store.state);
        for (id, account) in &self.accounts {
            state.accounts.insert(*id, account.clone());
        }
        state.transfers.extend(self.transfers.iter().cloned());
        state.entries.extend(self.entries.iter().cloned());
    }
}

#[async_trait]
impl BookingUnit for MemoryBookingUnit<'_> {
    async fn lock_account(&mut self, id: i64) -> Result<Option<Account>, StoreError> {
        let guard = self.store.account_lock(id).lock_owned().await;
        self.guards.push(guard);

        let account = lock(&self.store.state).accounts.get(&id).cloned();
        if let Some(account) = &account {
            self.accounts.insert(id, account.clone());
        }
        Ok(account)
    }

    async fn account_limit(&mut self, account_id: i64) -> Result<Option<AccountLimit>, StoreError> {
        Ok(lock(&self.store.state).limits.get(&account_id).cloned())
    }

    async fn sum_outgoing_transfers(
        &mut self,
        account_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let committed = lock(&self.store.state).sum_outgoing(account_id, from, to);
        Ok(committed + sum_outgoing(&self.transfers, account_id, from, to))
    }

    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, StoreError> {
        if delta > 0 {
            self.injected(FailPoint::BeforeCredit)?;
        }
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::Query(format!("account {id} is not locked")))?;
        account.balance = account
            .balance
            .checked_add(delta)
            .ok_or_else(|| StoreError::Query(format!("balance overflow on account {id}")))?;
        Ok(account.clone())
    }

    async fn insert_transfer(&mut self, transfer: NewTransfer) -> Result<Transfer, StoreError> {
        self.injected(FailPoint::BeforeRecords)?;
        let id = {
            let mut state = lock(&self.store.state);
            state.next_transfer_id += 1;
            state.next_transfer_id
        };
        let transfer = Transfer {
            id,
            from_account_id: transfer.from_account_id,
            to_account_id: transfer.to_account_id,
            amount: transfer.amount,
            created_at: transfer.created_at,
        };
        self.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn insert_entry(&mut self, entry: NewEntry) -> Result<Entry, StoreError> {
        let id = {
            let mut state = lock(&self.store.state);
            state.next_entry_id += 1;
            state.next_entry_id
        };
        let entry = Entry {
            id,
            account_id: entry.account_id,
            transfer_id: entry.transfer_id,
            amount: entry.amount,
            created_at: entry.created_at,
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError> {
        self.check_available()?;
        Ok(self.account(id))
    }

    async fn get_account_limit(&self, account_id: i64) -> Result<Option<AccountLimit>, StoreError> {
        self.check_available()?;
        Ok(lock(&self.state).limits.get(&account_id).cloned())
    }

    async fn get_account_alert(&self, account_id: i64) -> Result<Option<AccountAlert>, StoreError> {
        self.check_available()?;
        Ok(lock(&self.state).alerts.get(&account_id).cloned())
    }

    async fn sum_outgoing_transfers(
        &self,
        account_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        self.check_available()?;
        Ok(lock(&self.state).sum_outgoing(account_id, from, to))
    }

    async fn upsert_account_limit(
        &self,
        params: UpsertAccountLimit,
    ) -> Result<AccountLimit, StoreError> {
        self.check_available()?;
        let now = Utc::now();
        let mut state = lock(&self.state);
        let limit = state
            .limits
            .entry(params.account_id)
            .and_modify(|limit| {
                limit.daily_transfer_limit = params.daily_transfer_limit;
                limit.updated_at = now;
            })
            .or_insert_with(|| AccountLimit {
                account_id: params.account_id,
                daily_transfer_limit: params.daily_transfer_limit,
                created_at: now,
                updated_at: now,
            });
        Ok(limit.clone())
    }

    async fn upsert_account_alert(
        &self,
        params: UpsertAccountAlert,
    ) -> Result<AccountAlert, StoreError> {
        self.check_available()?;
        let now = Utc::now();
        let mut state = lock(&self.state);
        let alert = state
            .alerts
            .entry(params.account_id)
            .and_modify(|alert| {
                alert.low_balance_threshold = params.low_balance_threshold;
                alert.high_balance_threshold = params.high_balance_threshold;
                alert.updated_at = now;
            })
            .or_insert_with(|| AccountAlert {
                account_id: params.account_id,
                low_balance_threshold: params.low_balance_threshold,
                high_balance_threshold: params.high_balance_threshold,
                created_at: now,
                updated_at: now,
            });
        Ok(alert.clone())
    }

    async fn transfer_tx(
        &self,
        request: TransferRequest,
        now: DateTime<Utc>,
    ) -> Result<TransferTxResult, LedgerError> {
        self.check_available()?;
        let mut unit = MemoryBookingUnit::begin(self);
        let result = executor::book(&mut unit, request, now).await?;
        unit.commit();
        Ok(result)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        Ok(lock(&self.state).users.get(username).cloned())
    }
}
