use crate::schema::accounts;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AccountRow {
    pub id: i64,
    pub owner: String,
    pub balance: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRow> for ledger::Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            owner: row.owner,
            balance: row.balance,
            currency: row.currency,
            created_at: row.created_at,
        }
    }
}
