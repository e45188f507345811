use crate::schema::users;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for ledger::User {
    fn from(row: UserRow) -> Self {
        Self {
            username: row.username,
            full_name: row.full_name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}
