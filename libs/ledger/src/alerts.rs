//! Balance threshold crossing detection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{Account, AccountAlert};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    Low,
    High,
}

impl AlertDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
        }
    }
}

impl fmt::Display for AlertDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `send_account_alert` task.
///
/// `account_id`, `direction` and `threshold` identify the crossing, so a
/// redelivered task can be recognised downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadAccountAlert {
    pub username: String,
    pub account_id: i64,
    pub balance: i64,
    pub threshold: i64,
    pub direction: AlertDirection,
    pub currency: String,
}

impl PayloadAccountAlert {
    fn crossing(after: &Account, threshold: i64, direction: AlertDirection) -> Self {
        Self {
            username: after.owner.clone(),
            account_id: after.id,
            balance: after.balance,
            threshold,
            direction,
            currency: after.currency.clone(),
        }
    }
}

/// Alerts for the thresholds crossed between `before` and `after`.
///
/// Edge-triggered: a balance that was already past a threshold and stays
/// there yields nothing. Both snapshots must come from the same booking.
pub fn detect_crossings(
    alert: Option<&AccountAlert>,
    before: &Account,
    after: &Account,
) -> Vec<PayloadAccountAlert> {
    let Some(alert) = alert else {
        return Vec::new();
    };

    let mut crossings = Vec::with_capacity(2);

    let low = alert.low_balance_threshold;
    if low > 0 && before.balance > low && after.balance <= low {
        crossings.push(PayloadAccountAlert::crossing(after, low, AlertDirection::Low));
    }

    let high = alert.high_balance_threshold;
    if high > 0 && before.balance < high && after.balance >= high {
        crossings.push(PayloadAccountAlert::crossing(after, high, AlertDirection::High));
    }

    crossings
}
