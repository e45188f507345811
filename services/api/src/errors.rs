use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ledger::{LedgerError, StoreError};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    /// Stable machine-readable error code.
    pub code: &'static str,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthenticated", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
                "code": self.code,
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound(_) => AppError::not_found(err.to_string()),
            LedgerError::Validation(message) => AppError::bad_request(message),
            LedgerError::LimitExceeded { .. } => {
                AppError::new(StatusCode::FORBIDDEN, "daily_limit_exceeded", err.to_string())
            }
            LedgerError::PermissionDenied(message) => AppError::forbidden(message),
            LedgerError::Store(StoreError::Timeout | StoreError::Unavailable(_)) => {
                tracing::error!(error = %err, "store unavailable");
                AppError::service_unavailable("service temporarily unavailable")
            }
            LedgerError::Store(StoreError::Query(_)) => {
                tracing::error!(error = %err, "store query failed");
                AppError::internal_server_error("internal server error")
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
