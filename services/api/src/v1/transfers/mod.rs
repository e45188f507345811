use axum::{routing::post, Router};

use crate::AppState;

mod create;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create::handler))
}
