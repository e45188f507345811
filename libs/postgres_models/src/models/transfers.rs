use crate::schema::{entries, transfers};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = transfers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TransferRow {
    pub id: i64,
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Insertable)]
#[diesel(table_name = transfers)]
pub struct NewTransferRow {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ledger::NewTransfer> for NewTransferRow {
    fn from(transfer: ledger::NewTransfer) -> Self {
        Self {
            from_account_id: transfer.from_account_id,
            to_account_id: transfer.to_account_id,
            amount: transfer.amount,
            created_at: transfer.created_at,
        }
    }
}

impl From<TransferRow> for ledger::Transfer {
    fn from(row: TransferRow) -> Self {
        Self {
            id: row.id,
            from_account_id: row.from_account_id,
            to_account_id: row.to_account_id,
            amount: row.amount,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EntryRow {
    pub id: i64,
    pub account_id: i64,
    pub transfer_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Insertable)]
#[diesel(table_name = entries)]
pub struct NewEntryRow {
    pub account_id: i64,
    pub transfer_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ledger::NewEntry> for NewEntryRow {
    fn from(entry: ledger::NewEntry) -> Self {
        Self {
            account_id: entry.account_id,
            transfer_id: entry.transfer_id,
            amount: entry.amount,
            created_at: entry.created_at,
        }
    }
}

impl From<EntryRow> for ledger::Entry {
    fn from(row: EntryRow) -> Self {
        Self {
            id: row.id,
            account_id: row.account_id,
            transfer_id: row.transfer_id,
            amount: row.amount,
            created_at: row.created_at,
        }
    }
}
