//! Postgres implementation of the ledger store traits.
//!
//! Bookings run inside one database transaction. Accounts are read with
//! `SELECT ... FOR UPDATE`, so concurrent bookings touching the same
//! account serialize on the row lock until commit or rollback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Timestamptz};
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use ledger::{
    executor, Account, AccountAlert, AccountLimit, AccountStore, BookingUnit, Entry, LedgerError,
    NewEntry, NewTransfer, StoreError, Transfer, TransferRequest, TransferTxResult,
    UpsertAccountAlert, UpsertAccountLimit, User, UserStore,
};

use crate::models::{
    AccountAlertRow, AccountLimitRow, AccountRow, EntryRow, NewAccountAlertRow,
    NewAccountLimitRow, NewEntryRow, NewTransferRow, TransferRow, UserRow,
};
use crate::schema::{account_alerts, account_limits, accounts, entries, transfers, users};
use crate::{DbConnection, DbError, DbPool};

const OUTGOING_TOTAL_SQL: &str = "SELECT COALESCE(SUM(amount), 0)::BIGINT AS total \
     FROM transfers \
     WHERE from_account_id = $1 AND created_at >= $2 AND created_at < $3";

#[derive(QueryableByName)]
struct OutgoingTotal {
    #[diesel(sql_type = BigInt)]
    total: i64,
}

fn query_error(err: diesel::result::Error) -> StoreError {
    StoreError::from(DbError::Query(err))
}

async fn outgoing_total(
    conn: &mut AsyncPgConnection,
    account_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64, diesel::result::Error> {
    let row = diesel::sql_query(OUTGOING_TOTAL_SQL)
        .bind::<BigInt, _>(account_id)
        .bind::<Timestamptz, _>(from)
        .bind::<Timestamptz, _>(to)
        .get_result::<OutgoingTotal>(conn)
        .await?;
    Ok(row.total)
}

/// Why a booking transaction rolled back.
#[derive(Debug)]
enum BookingFailure {
    Ledger(LedgerError),
    Db(diesel::result::Error),
}

impl From<diesel::result::Error> for BookingFailure {
    fn from(err: diesel::result::Error) -> Self {
        Self::Db(err)
    }
}

impl From<BookingFailure> for LedgerError {
    fn from(failure: BookingFailure) -> Self {
        match failure {
            BookingFailure::Ledger(err) => err,
            BookingFailure::Db(err) => LedgerError::Store(query_error(err)),
        }
    }
}

struct PgBookingUnit<'a> {
    conn: &'a mut AsyncPgConnection,
}

#[async_trait]
impl BookingUnit for PgBookingUnit<'_> {
    async fn lock_account(&mut self, id: i64) -> Result<Option<Account>, StoreError> {
        let row = accounts::table
            .find(id)
            .for_update()
            .select(AccountRow::as_select())
            .first(&mut *self.conn)
            .await
            .optional()
            .map_err(query_error)?;
        Ok(row.map(Account::from))
    }

    async fn account_limit(&mut self, account_id: i64) -> Result<Option<AccountLimit>, StoreError> {
        let row = account_limits::table
            .find(account_id)
            .select(AccountLimitRow::as_select())
            .first(&mut *self.conn)
            .await
            .optional()
            .map_err(query_error)?;
        Ok(row.map(AccountLimit::from))
    }

    async fn sum_outgoing_transfers(
        &mut self,
        account_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        outgoing_total(self.conn, account_id, from, to)
            .await
            .map_err(query_error)
    }

    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, StoreError> {
        let row = diesel::update(accounts::table.find(id))
            .set(accounts::balance.eq(accounts::balance + delta))
            .returning(AccountRow::as_returning())
            .get_result(&mut *self.conn)
            .await
            .map_err(query_error)?;
        Ok(row.into())
    }

    async fn insert_transfer(&mut self, transfer: NewTransfer) -> Result<Transfer, StoreError> {
        let row = diesel::insert_into(transfers::table)
            .values(NewTransferRow::from(transfer))
            .returning(TransferRow::as_returning())
            .get_result(&mut *self.conn)
            .await
            .map_err(query_error)?;
        Ok(row.into())
    }

    async fn insert_entry(&mut self, entry: NewEntry) -> Result<Entry, StoreError> {
        let row = diesel::insert_into(entries::table)
            .values(NewEntryRow::from(entry))
            .returning(EntryRow::as_returning())
            .get_result(&mut *self.conn)
            .await
            .map_err(query_error)?;
        Ok(row.into())
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<DbConnection, StoreError> {
        self.pool
            .get_owned()
            .await
            .map_err(|e| StoreError::from(DbError::Pool(e)))
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn get_account(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let mut conn = self.conn().await?;
        let row = accounts::table
            .find(id)
            .select(AccountRow::as_select())
            .first(&mut *conn)
            .await
            .optional()
            .map_err(query_error)?;
        Ok(row.map(Account::from))
    }

    async fn get_account_limit(&self, account_id: i64) -> Result<Option<AccountLimit>, StoreError> {
        let mut conn = self.conn().await?;
        let row = account_limits::table
            .find(account_id)
            .select(AccountLimitRow::as_select())
            .first(&mut *conn)
            .await
            .optional()
            .map_err(query_error)?;
        Ok(row.map(AccountLimit::from))
    }

    async fn get_account_alert(&self, account_id: i64) -> Result<Option<AccountAlert>, StoreError> {
        let mut conn = self.conn().await?;
        let row = account_alerts::table
            .find(account_id)
            .select(AccountAlertRow::as_select())
            .first(&mut *conn)
            .await
            .optional()
            .map_err(query_error)?;
        Ok(row.map(AccountAlert::from))
    }

    async fn sum_outgoing_transfers(
        &self,
        account_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let mut conn = self.conn().await?;
        outgoing_total(&mut conn, account_id, from, to)
            .await
            .map_err(query_error)
    }

    async fn upsert_account_limit(
        &self,
        params: UpsertAccountLimit,
    ) -> Result<AccountLimit, StoreError> {
        let mut conn = self.conn().await?;
        let now = Utc::now();
        let row = diesel::insert_into(account_limits::table)
            .values(NewAccountLimitRow::new(params, now))
            .on_conflict(account_limits::account_id)
            .do_update()
            .set((
                account_limits::daily_transfer_limit
                    .eq(excluded(account_limits::daily_transfer_limit)),
                account_limits::updated_at.eq(now),
            ))
            .returning(AccountLimitRow::as_returning())
            .get_result(&mut *conn)
            .await
            .map_err(query_error)?;
        Ok(row.into())
    }

    async fn upsert_account_alert(
        &self,
        params: UpsertAccountAlert,
    ) -> Result<AccountAlert, StoreError> {
        let mut conn = self.conn().await?;
        let now = Utc::now();
        let row = diesel::insert_into(account_alerts::table)
            .values(NewAccountAlertRow::new(params, now))
            .on_conflict(account_alerts::account_id)
            .do_update()
            .set((
                account_alerts::low_balance_threshold
                    .eq(excluded(account_alerts::low_balance_threshold)),
                account_alerts::high_balance_threshold
                    .eq(excluded(account_alerts::high_balance_threshold)),
                account_alerts::updated_at.eq(now),
            ))
            .returning(AccountAlertRow::as_returning())
            .get_result(&mut *conn)
            .await
            .map_err(query_error)?;
        Ok(row.into())
    }

    async fn transfer_tx(
        &self,
        request: TransferRequest,
        now: DateTime<Utc>,
    ) -> Result<TransferTxResult, LedgerError> {
        let mut conn = self.conn().await?;
        let result = conn
            .transaction::<_, BookingFailure, _>(|conn| {
                async move {
                    let mut unit = PgBookingUnit { conn };
                    executor::book(&mut unit, request, now)
                        .await
                        .map_err(BookingFailure::Ledger)
                }
                .scope_boxed()
            })
            .await;

        if let Err(BookingFailure::Db(err)) = &result {
            tracing::error!(error = %err, "transfer transaction failed");
        }
        Ok(result?)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn get_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.conn().await?;
        let row = users::table
            .find(username)
            .select(UserRow::as_select())
            .first(&mut *conn)
            .await
            .optional()
            .map_err(query_error)?;
        Ok(row.map(User::from))
    }
}
