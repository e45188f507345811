use anyhow::Result;
use dotenvy::dotenv;
use ledger_api::{app, config::Config, AppState};
use std::net::SocketAddr;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledger_api=debug,ledger=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    let state = AppState::new(&config).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(environment = %config.environment, "Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
