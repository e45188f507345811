//! Daily transfer limit over the current UTC day.
//!
//! The authoritative check runs inside the booking unit, after the source
//! account's lock is held (see [`crate::executor::book`]). Every transfer
//! out of an account takes that lock before summing, so two concurrent
//! transfers from one account cannot both pass against the same total.
//! [`crate::service::TransferService::check_daily_limit`] evaluates the same
//! rule without a lock and is only an early rejection.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::error::LedgerError;
use crate::models::AccountLimit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitDecision {
    Allowed,
    Exceeded { limit: i64, used: i64, requested: i64 },
}

impl LimitDecision {
    pub fn into_result(self, account_id: i64) -> Result<(), LedgerError> {
        match self {
            Self::Allowed => Ok(()),
            Self::Exceeded {
                limit,
                used,
                requested,
            } => Err(LedgerError::LimitExceeded {
                account_id,
                limit,
                used,
                requested,
            }),
        }
    }
}

/// `[start of the UTC day containing now, start + 24h)`.
pub fn utc_day_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::hours(24))
}

/// The cap to enforce, or `None` when the account is unrestricted.
pub fn enforced_limit(limit: Option<&AccountLimit>) -> Option<i64> {
    limit
        .map(|limit| limit.daily_transfer_limit)
        .filter(|cap| *cap > 0)
}

pub fn evaluate(limit: Option<&AccountLimit>, used: i64, requested: i64) -> LimitDecision {
    let Some(cap) = enforced_limit(limit) else {
        return LimitDecision::Allowed;
    };

    match used.checked_add(requested) {
        Some(total) if total <= cap => LimitDecision::Allowed,
        _ => LimitDecision::Exceeded {
            limit: cap,
            used,
            requested,
        },
    }
}
