use anyhow::{Context, Result};
use ledger::tasks::{DEFAULT_MAX_RETRY, DEFAULT_QUEUE};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub environment: String,
    /// Queue alert tasks are distributed to.
    pub alert_queue: String,
    pub alert_max_retry: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            port: var("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
            database_url: var("DATABASE_URL").context("DATABASE_URL must be set")?,
            redis_url: var("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string()),
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            alert_queue: var("ALERT_QUEUE").unwrap_or_else(|| DEFAULT_QUEUE.to_string()),
            alert_max_retry: match var("ALERT_MAX_RETRY") {
                Some(value) => value.parse().context("ALERT_MAX_RETRY must be a number")?,
                None => DEFAULT_MAX_RETRY,
            },
        })
    }
}
