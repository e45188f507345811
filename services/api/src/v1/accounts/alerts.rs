use axum::{
    extract::{Path, State},
    Json,
};
use ledger::{AccountAlert, UpsertAccountAlert};
use serde::Deserialize;

use super::owned_account;
use crate::{
    errors::{AppError, AppResult},
    extractors::AuthenticatedUser,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct UpdateAlertRequest {
    pub low_balance_threshold: i64,
    pub high_balance_threshold: i64,
}

pub async fn get_handler(
    State(state): State<AppState>,
    AuthenticatedUser(username): AuthenticatedUser,
    Path(account_id): Path<i64>,
) -> AppResult<Json<AccountAlert>> {
    owned_account(&state, &username, account_id).await?;

    state
        .service
        .get_account_alert(account_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::not_found(format!("no balance alert configured for account {account_id}"))
        })
}

pub async fn put_handler(
    State(state): State<AppState>,
    AuthenticatedUser(username): AuthenticatedUser,
    Path(account_id): Path<i64>,
    Json(req): Json<UpdateAlertRequest>,
) -> AppResult<Json<AccountAlert>> {
    owned_account(&state, &username, account_id).await?;

    let alert = state
        .service
        .upsert_account_alert(UpsertAccountAlert {
            account_id,
            low_balance_threshold: req.low_balance_threshold,
            high_balance_threshold: req.high_balance_threshold,
        })
        .await?;
    tracing::info!(
        account_id,
        low = alert.low_balance_threshold,
        high = alert.high_balance_threshold,
        "balance alert updated"
    );
    Ok(Json(alert))
}
