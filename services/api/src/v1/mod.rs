use axum::Router;

use crate::AppState;

mod accounts;
mod transfers;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/transfers", transfers::router())
        .nest("/accounts", accounts::router())
}
