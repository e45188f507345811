pub mod queue;

pub use queue::RedisTaskQueue;

use deadpool_redis::{Config, Pool, Runtime};
use ledger::QueueError;

pub type RedisPool = Pool;

#[derive(Debug, thiserror::Error)]
pub enum RedisError {
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Redis error: {0}")]
    Redis(#[from] deadpool_redis::redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<RedisError> for QueueError {
    fn from(err: RedisError) -> Self {
        match err {
            RedisError::Pool(e) => QueueError::Unavailable(e.to_string()),
            RedisError::Config(message) => QueueError::Unavailable(message),
            RedisError::Redis(e) if e.is_io_error() || e.is_connection_dropped() => {
                QueueError::Unavailable(e.to_string())
            }
            RedisError::Redis(e) => QueueError::Backend(e.to_string()),
            RedisError::Serialization(e) => QueueError::Serialization(e),
        }
    }
}

pub async fn create_pool(redis_url: &str) -> Result<RedisPool, RedisError> {
    let cfg = Config::from_url(redis_url);
    let pool = cfg
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| RedisError::Config(e.to_string()))?;
    Ok(pool)
}
