#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store query error: {0}")]
    Query(String),

    #[error("Store operation timed out")]
    Timeout,
}

/// Errors surfaced by transfer execution and account configuration.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("account {0} not found")]
    AccountNotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error(
        "daily transfer limit exceeded for account {account_id}: \
         limit {limit}, already transferred {used}, requested {requested}"
    )]
    LimitExceeded {
        account_id: i64,
        limit: i64,
        used: i64,
        requested: i64,
    },

    #[error("{0}")]
    PermissionDenied(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue unavailable: {0}")]
    Unavailable(String),

    #[error("Task serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Queue backend error: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("notification transport unavailable: {0}")]
    Unavailable(String),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Outcome of a failed task. Permanent failures are never retried.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("permanent task failure: {0}")]
    Permanent(String),

    #[error("transient task failure: {0}")]
    Transient(String),
}

impl ProcessError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
