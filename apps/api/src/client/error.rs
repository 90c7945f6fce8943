use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::errors::AppError;

/// Failure kinds a screening view has to react to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Public link unknown, malformed or expired, or a bearer credential rejected.
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("session closed: {0}")]
    SessionClosed(String),

    #[error("invalid message: {0}")]
    Validation(String),

    /// Timeout, connection failure, rate limit or server-side hiccup.
    #[error("temporarily unavailable: {0}")]
    Transient(String),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl ClientError {
    /// True only for failures worth trying again later. Nothing is retried
    /// automatically; callers decide.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transient(_))
    }

    /// Maps an error response from the screening API.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => (Some(envelope.error.code), envelope.error.message),
            Err(_) => (None, body.to_string()),
        };

        match code.as_deref() {
            Some("ACCESS_DENIED" | "UNAUTHORIZED") => ClientError::AccessDenied(message),
            Some("FORBIDDEN") => ClientError::Forbidden,
            Some("NOT_FOUND") => ClientError::NotFound(message),
            Some("SESSION_CLOSED") => ClientError::SessionClosed(message),
            Some("VALIDATION_ERROR") => ClientError::Validation(message),
            Some("TRANSIENT" | "RATE_LIMITED") => ClientError::Transient(message),
            _ if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
                ClientError::Transient(format!("{status}: {message}"))
            }
            _ => ClientError::Unexpected(format!("{status}: {message}")),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            ClientError::Transient(e.to_string())
        } else {
            ClientError::Unexpected(e.to_string())
        }
    }
}

impl From<AppError> for ClientError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::Validation(msg) => ClientError::Validation(msg),
            other => ClientError::Unexpected(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}
