use crate::schema::account_alerts;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = account_alerts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AccountAlertRow {
    pub account_id: i64,
    pub low_balance_threshold: i64,
    pub high_balance_threshold: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Insertable)]
#[diesel(table_name = account_alerts)]
pub struct NewAccountAlertRow {
    pub account_id: i64,
    pub low_balance_threshold: i64,
    pub high_balance_threshold: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewAccountAlertRow {
    pub fn new(params: ledger::UpsertAccountAlert, now: DateTime<Utc>) -> Self {
        Self {
            account_id: params.account_id,
            low_balance_threshold: params.low_balance_threshold,
            high_balance_threshold: params.high_balance_threshold,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<AccountAlertRow> for ledger::AccountAlert {
    fn from(row: AccountAlertRow) -> Self {
        Self {
            account_id: row.account_id,
            low_balance_threshold: row.low_balance_threshold,
            high_balance_threshold: row.high_balance_threshold,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
