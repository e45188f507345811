pub mod config;
pub mod errors;
pub mod extractors;
pub mod v1;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use ledger::{TaskDistributor, TaskOptions, TransferService};
use postgres_models::PgStore;
use redis_cache::RedisTaskQueue;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TransferService>,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let db_pool = postgres_models::create_pool(&config.database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?;
        let redis_pool = redis_cache::create_pool(&config.redis_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create Redis pool: {}", e))?;

        let distributor = TaskDistributor::new(Arc::new(RedisTaskQueue::new(redis_pool)))
            .with_options(TaskOptions {
                queue: config.alert_queue.clone(),
                max_retry: config.alert_max_retry,
            });
        let service =
            TransferService::new(Arc::new(PgStore::new(db_pool))).with_distributor(distributor);

        Ok(Self::from_service(service))
    }

    pub fn from_service(service: TransferService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "ledger-api"
    }))
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/v1", v1::router())
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
