use axum::{routing::get, Router};
use ledger::{Account, LedgerError};

use crate::{
    errors::{AppError, AppResult},
    AppState,
};

mod alerts;
mod limits;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/limits", get(limits::get_handler).put(limits::put_handler))
        .route("/:id/alerts", get(alerts::get_handler).put(alerts::put_handler))
}

/// Load an account the caller owns.
async fn owned_account(state: &AppState, username: &str, account_id: i64) -> AppResult<Account> {
    if account_id < 1 {
        return Err(AppError::bad_request("account id must be positive"));
    }
    let account = state.service.get_account(account_id).await?;
    if account.owner != username {
        return Err(LedgerError::permission_denied(
            "account doesn't belong to the authenticated user",
        )
        .into());
    }
    Ok(account)
}
