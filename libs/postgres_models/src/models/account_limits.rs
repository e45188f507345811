use crate::schema::account_limits;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = account_limits)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AccountLimitRow {
    pub account_id: i64,
    pub daily_transfer_limit: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Insertable)]
#[diesel(table_name = account_limits)]
pub struct NewAccountLimitRow {
    pub account_id: i64,
    pub daily_transfer_limit: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewAccountLimitRow {
    pub fn new(params: ledger::UpsertAccountLimit, now: DateTime<Utc>) -> Self {
        Self {
            account_id: params.account_id,
            daily_transfer_limit: params.daily_transfer_limit,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<AccountLimitRow> for ledger::AccountLimit {
    fn from(row: AccountLimitRow) -> Self {
        Self {
            account_id: row.account_id,
            daily_transfer_limit: row.daily_transfer_limit,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
