use axum::{
    extract::{Path, State},
    Json,
};
use ledger::{AccountLimit, UpsertAccountLimit};
use serde::Deserialize;

use super::owned_account;
use crate::{
    errors::{AppError, AppResult},
    extractors::AuthenticatedUser,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct UpdateLimitRequest {
    pub daily_transfer_limit: i64,
}

pub async fn get_handler(
    State(state): State<AppState>,
    AuthenticatedUser(username): AuthenticatedUser,
    Path(account_id): Path<i64>,
) -> AppResult<Json<AccountLimit>> {
    owned_account(&state, &username, account_id).await?;

    state
        .service
        .get_account_limit(account_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::not_found(format!("no daily limit configured for account {account_id}"))
        })
}

pub async fn put_handler(
    State(state): State<AppState>,
    AuthenticatedUser(username): AuthenticatedUser,
    Path(account_id): Path<i64>,
    Json(req): Json<UpdateLimitRequest>,
) -> AppResult<Json<AccountLimit>> {
    owned_account(&state, &username, account_id).await?;

    let limit = state
        .service
        .upsert_account_limit(UpsertAccountLimit {
            account_id,
            daily_transfer_limit: req.daily_transfer_limit,
        })
        .await?;
    tracing::info!(
        account_id,
        daily_transfer_limit = limit.daily_transfer_limit,
        "daily limit updated"
    );
    Ok(Json(limit))
}
