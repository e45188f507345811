//! Double-entry booking of one transfer.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::LedgerError;
use crate::limit::{enforced_limit, evaluate, utc_day_window, LimitDecision};
use crate::models::{NewEntry, NewTransfer, TransferRequest, TransferTxResult};
use crate::store::BookingUnit;

/// Accounts are always locked lowest id first, whichever side is the source.
pub fn lock_order(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

pub fn validate(request: &TransferRequest) -> Result<(), LedgerError> {
    if request.amount <= 0 {
        return Err(LedgerError::validation("amount must be greater than zero"));
    }
    if request.from_account_id == request.to_account_id {
        return Err(LedgerError::validation(
            "source and destination accounts must differ",
        ));
    }
    Ok(())
}

/// Book `request` through `unit`.
///
/// Locks both accounts, re-checks the source account's daily limit under
/// that lock, moves the balances and records the transfer with its two
/// entries. The caller owns atomicity: on any error it must discard the
/// unit, on success it commits.
pub async fn book<U>(
    unit: &mut U,
    request: TransferRequest,
    now: DateTime<Utc>,
) -> Result<TransferTxResult, LedgerError>
where
    U: BookingUnit + ?Sized,
{
    validate(&request)?;
    let TransferRequest {
        from_account_id,
        to_account_id,
        amount,
    } = request;

    let (first_id, second_id) = lock_order(from_account_id, to_account_id);
    let first = unit
        .lock_account(first_id)
        .await?
        .ok_or(LedgerError::AccountNotFound(first_id))?;
    let second = unit
        .lock_account(second_id)
        .await?
        .ok_or(LedgerError::AccountNotFound(second_id))?;
    let (from_account_before, to_account_before) = if first_id == from_account_id {
        (first, second)
    } else {
        (second, first)
    };

    let limit = unit.account_limit(from_account_id).await?;
    if enforced_limit(limit.as_ref()).is_some() {
        let (day_start, day_end) = utc_day_window(now);
        let used = unit
            .sum_outgoing_transfers(from_account_id, day_start, day_end)
            .await?;
        let decision = evaluate(limit.as_ref(), used, amount);
        if let LimitDecision::Exceeded { limit, .. } = decision {
            debug!(
                account_id = from_account_id,
                limit, used, amount, "daily limit would be exceeded"
            );
        }
        decision.into_result(from_account_id)?;
    }

    let from_account = unit.add_account_balance(from_account_id, -amount).await?;
    let to_account = unit.add_account_balance(to_account_id, amount).await?;

    let transfer = unit
        .insert_transfer(NewTransfer {
            from_account_id,
            to_account_id,
            amount,
            created_at: now,
        })
        .await?;
    let from_entry = unit
        .insert_entry(NewEntry {
            account_id: from_account_id,
            transfer_id: transfer.id,
            amount: -amount,
            created_at: now,
        })
        .await?;
    let to_entry = unit
        .insert_entry(NewEntry {
            account_id: to_account_id,
            transfer_id: transfer.id,
            amount,
            created_at: now,
        })
        .await?;

    debug!(
        transfer_id = transfer.id,
        from_account_id, to_account_id, amount, "booked transfer"
    );

    Ok(TransferTxResult {
        transfer,
        from_entry,
        to_entry,
        from_account_before,
        from_account,
        to_account_before,
        to_account,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_order_is_direction_independent() {
        assert_eq!(lock_order(7, 3), (3, 7));
        assert_eq!(lock_order(3, 7), (3, 7));
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let request = TransferRequest {
            from_account_id: 1,
            to_account_id: 2,
            amount: 0,
        };
        assert!(matches!(validate(&request), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn rejects_self_transfer() {
        let request = TransferRequest {
            from_account_id: 4,
            to_account_id: 4,
            amount: 10,
        };
        assert!(matches!(validate(&request), Err(LedgerError::Validation(_))));
    }
}
