use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Body returned for every public-token failure. Unknown, expired and
/// malformed tokens must be indistinguishable to the caller.
pub const ACCESS_DENIED_MESSAGE: &str =
    "This chat link is invalid or has expired. Please contact the recruiting team for assistance.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    /// Public-token failure. Carries no detail on purpose; see `ACCESS_DENIED_MESSAGE`.
    #[error("Access denied")]
    AccessDenied,

    #[error("Session is closed: {0}")]
    SessionClosed(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, shared with the HTTP client in `crate::client`.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::AccessDenied => "ACCESS_DENIED",
            AppError::SessionClosed(_) => "SESSION_CLOSED",
            AppError::RateLimited => "RATE_LIMITED",
            AppError::Transient(_) => "TRANSIENT",
            AppError::Database(sqlx::Error::PoolTimedOut) => "TRANSIENT",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Llm(_) => "LLM_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::Transient(format!("redis: {e}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Operation not permitted".to_string()),
            AppError::AccessDenied => (StatusCode::FORBIDDEN, ACCESS_DENIED_MESSAGE.to_string()),
            AppError::SessionClosed(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests. Please wait a moment before sending another message."
                    .to_string(),
            ),
            AppError::Transient(msg) => {
                tracing::warn!("Transient failure: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The service is temporarily unavailable, please retry".to_string(),
                )
            }
            AppError::Database(sqlx::Error::PoolTimedOut) => {
                tracing::warn!("Database pool timed out");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The service is temporarily unavailable, please retry".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
