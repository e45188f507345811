use std::time::Duration;

use anyhow::{Context, Result};
use ledger::tasks::{DEFAULT_LEASE_TIMEOUT, DEFAULT_QUEUE};
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub alert_queue: String,
    pub concurrency: usize,
    pub poll_interval: Duration,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// How long a leased task may run before it is handed out again.
    pub lease_timeout: Duration,
    /// Where notifications are posted. Log-only delivery when unset.
    pub notify_webhook_url: Option<Url>,
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(value) => value
            .parse()
            .with_context(|| format!("{key} must be a valid number")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let notify_webhook_url = match var("NOTIFY_WEBHOOK_URL").filter(|v| !v.is_empty()) {
            Some(raw) => {
                Some(Url::parse(&raw).context("NOTIFY_WEBHOOK_URL must be a valid URL")?)
            }
            None => None,
        };

        Ok(Self {
            database_url: var("DATABASE_URL").context("DATABASE_URL must be set")?,
            redis_url: var("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string()),
            alert_queue: var("ALERT_QUEUE").unwrap_or_else(|| DEFAULT_QUEUE.to_string()),
            concurrency: parse_or(&var, "WORKER_CONCURRENCY", 10)?,
            poll_interval: Duration::from_millis(parse_or(&var, "WORKER_POLL_INTERVAL_MS", 500)?),
            retry_base_delay: Duration::from_secs(parse_or(&var, "RETRY_BASE_DELAY_SECS", 10)?),
            retry_max_delay: Duration::from_secs(parse_or(&var, "RETRY_MAX_DELAY_SECS", 3600)?),
            lease_timeout: Duration::from_secs(parse_or(
                &var,
                "WORKER_LEASE_TIMEOUT_SECS",
                DEFAULT_LEASE_TIMEOUT.as_secs(),
            )?),
            notify_webhook_url,
        })
    }
}
