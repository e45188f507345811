use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use ledger::{Mailer, RetryPolicy, TaskProcessor, TaskRunner};
use postgres_models::PgStore;
use redis_cache::RedisTaskQueue;
use tokio::sync::watch;
use tracing::info;

mod config;
mod mailer;

use crate::config::Config;
use crate::mailer::{LogMailer, WebhookMailer};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledger_worker=debug,ledger=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db_pool = postgres_models::create_pool(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?;
    let redis_pool = redis_cache::create_pool(&config.redis_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Redis pool: {}", e))?;

    let mailer: Arc<dyn Mailer> = match &config.notify_webhook_url {
        Some(url) => {
            info!(%url, "delivering notifications to webhook");
            Arc::new(WebhookMailer::new(url.clone()))
        }
        None => {
            info!("NOTIFY_WEBHOOK_URL not set, notifications are only logged");
            Arc::new(LogMailer)
        }
    };

    let processor = TaskProcessor::new(Arc::new(PgStore::new(db_pool)), mailer);
    let runner = TaskRunner::new(
        Arc::new(RedisTaskQueue::new(redis_pool).with_lease_timeout(config.lease_timeout)),
        processor,
        config.alert_queue.clone(),
    )
    .with_policy(RetryPolicy {
        base_delay: config.retry_base_delay,
        max_delay: config.retry_max_delay,
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for shutdown signal");
        }
        info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    info!(
        queue = %config.alert_queue,
        concurrency = config.concurrency,
        "Starting task worker"
    );
    Arc::new(runner)
        .run(config.concurrency, config.poll_interval, shutdown_rx)
        .await;
    info!("worker stopped");

    Ok(())
}
