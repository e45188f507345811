#![allow(dead_code)]

//! Shared setup for tests against a live Postgres.
//!
//! Tests run only when `TEST_DATABASE_URL` is set. The ledger tables in
//! that database are dropped and recreated once per test binary, so point
//! it at a throwaway database.

use std::sync::Arc;

use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl, SimpleAsyncConnection};
use ledger::Account;
use postgres_models::models::AccountRow;
use postgres_models::schema::{accounts, entries, transfers, users};
use postgres_models::{create_pool, DbPool, PgStore};
use tokio::sync::OnceCell;
use uuid::Uuid;

const DOWN_SQL: &str = include_str!("../../migrations/2024-06-01-000000_create_ledger/down.sql");
const UP_SQL: &str = include_str!("../../migrations/2024-06-01-000000_create_ledger/up.sql");

static SCHEMA: OnceCell<()> = OnceCell::const_new();

pub struct TestDb {
    pub pool: DbPool,
    pub store: Arc<PgStore>,
}

impl TestDb {
    /// `None` when no test database is configured.
    pub async fn connect() -> Option<Self> {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping Postgres test");
            return None;
        };

        SCHEMA
            .get_or_init(|| async {
                let mut conn = AsyncPgConnection::establish(&url)
                    .await
                    .expect("connect to test database");
                conn.batch_execute(DOWN_SQL).await.expect("drop ledger tables");
                conn.batch_execute(UP_SQL).await.expect("create ledger tables");
            })
            .await;

        let pool = create_pool(&url).await.expect("create pool");
        Some(Self {
            store: Arc::new(PgStore::new(pool.clone())),
            pool,
        })
    }

    /// Create a user with a unique name and one USD account for them.
    pub async fn account(&self, owner: &str, balance: i64) -> Account {
        let username = format!("{owner}-{}", Uuid::new_v4().simple());
        let mut conn = self.pool.get().await.expect("connection");

        diesel::insert_into(users::table)
            .values((
                users::username.eq(&username),
                users::full_name.eq(format!("{owner} Example")),
                users::email.eq(format!("{username}@example.com")),
            ))
            .execute(&mut *conn)
            .await
            .expect("insert user");

        diesel::insert_into(accounts::table)
            .values((
                accounts::owner.eq(&username),
                accounts::balance.eq(balance),
                accounts::currency.eq("USD"),
            ))
            .returning(AccountRow::as_returning())
            .get_result(&mut *conn)
            .await
            .expect("insert account")
            .into()
    }

    pub async fn balance(&self, account_id: i64) -> i64 {
        let mut conn = self.pool.get().await.expect("connection");
        accounts::table
            .find(account_id)
            .select(accounts::balance)
            .first(&mut *conn)
            .await
            .expect("account exists")
    }

    pub async fn outgoing_transfer_count(&self, account_id: i64) -> i64 {
        let mut conn = self.pool.get().await.expect("connection");
        transfers::table
            .filter(transfers::from_account_id.eq(account_id))
            .count()
            .get_result(&mut *conn)
            .await
            .expect("count transfers")
    }

    pub async fn entry_count(&self, account_id: i64) -> i64 {
        let mut conn = self.pool.get().await.expect("connection");
        entries::table
            .filter(entries::account_id.eq(account_id))
            .count()
            .get_result(&mut *conn)
            .await
            .expect("count entries")
    }
}
