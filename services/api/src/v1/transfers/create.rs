use axum::{extract::State, Json};
use ledger::{Account, Entry, LedgerError, Transfer};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{AppError, AppResult},
    extractors::AuthenticatedUser,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

impl CreateTransferRequest {
    fn validate(&self) -> AppResult<()> {
        if self.from_account_id < 1 || self.to_account_id < 1 {
            return Err(AppError::bad_request("account ids must be positive"));
        }
        if self.from_account_id == self.to_account_id {
            return Err(AppError::bad_request(
                "cannot transfer between the same account",
            ));
        }
        if self.amount <= 0 {
            return Err(AppError::bad_request("amount must be greater than zero"));
        }
        if self.currency.len() != 3 || !self.currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(AppError::bad_request(
                "currency must be a three-letter ISO code",
            ));
        }
        Ok(())
    }
}

/// Load an account and check it is held in the requested currency.
async fn valid_account(state: &AppState, account_id: i64, currency: &str) -> AppResult<Account> {
    let account = state.service.get_account(account_id).await?;
    if account.currency != currency {
        return Err(AppError::bad_request(format!(
            "account [{}] currency mismatch: {} vs {}",
            account.id, account.currency, currency
        )));
    }
    Ok(account)
}

pub async fn handler(
    State(state): State<AppState>,
    AuthenticatedUser(username): AuthenticatedUser,
    Json(req): Json<CreateTransferRequest>,
) -> AppResult<Json<TransferResponse>> {
    req.validate()?;

    let from_account = valid_account(&state, req.from_account_id, &req.currency).await?;
    if from_account.owner != username {
        return Err(LedgerError::permission_denied(
            "from account doesn't belong to the authenticated user",
        )
        .into());
    }
    valid_account(&state, req.to_account_id, &req.currency).await?;

    state
        .service
        .check_daily_limit(req.from_account_id, req.amount)
        .await?;

    let outcome = state
        .service
        .execute_transfer(req.from_account_id, req.to_account_id, req.amount)
        .await?;

    if outcome.alerts.failed > 0 {
        tracing::warn!(
            transfer_id = outcome.result.transfer.id,
            failed = outcome.alerts.failed,
            "some balance alerts were not queued"
        );
    }

    let result = outcome.result;
    Ok(Json(TransferResponse {
        transfer: result.transfer,
        from_account: result.from_account,
        to_account: result.to_account,
        from_entry: result.from_entry,
        to_entry: result.to_entry,
    }))
}
