//! # Centralized Error Handling
//!
//! This module defines the application-wide error type [`AppError`] used
//! consistently across all backend modules. It follows the `thiserror`
//! pattern for ergonomic error handling.
//!
//! ## Error Categories
//!
//! - [`Unauthenticated`](AppError::Unauthenticated) → 401: bad, missing, or
//!   expired credential. Fatal to the connection presenting it.
//! - [`Forbidden`](AppError::Forbidden) → 403: authenticated but not allowed
//!   (most commonly: not a member of the target room).
//! - [`InvalidInput`](AppError::InvalidInput) → 400: malformed payload,
//!   empty or over-length message text.
//! - [`NotFound`](AppError::NotFound) → 404: referenced room, user, or
//!   invite code does not exist.
//! - [`Transient`](AppError::Transient) → 503: the store is unavailable;
//!   the operation was denied and is safe to retry.
//! - [`Config`](AppError::Config) / [`Internal`](AppError::Internal) → 500.
//!
//! Every variant carries a context string; [`AppError::code`] exposes the
//! stable machine-readable name used in error payloads and socket events.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application-wide error type covering all error scenarios.
#[derive(Debug, Error)]
pub enum AppError {
    /// Credential missing, malformed, expired, or resolving to no user.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated but not permitted to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Request payload failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// External store or verifier temporarily unavailable; safe to retry.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Configuration error during startup or environment loading.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal server error (unexpected failures).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code, also used as the `reason` of
    /// socket error events.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "Unauthenticated",
            AppError::Forbidden(_) => "Forbidden",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Transient(_) => "Transient",
            AppError::Config(_) => "Config",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Get a user-friendly error message.
    ///
    /// For internal errors, returns a generic message to avoid exposing
    /// implementation details.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthenticated(msg)
            | AppError::Forbidden(msg)
            | AppError::InvalidInput(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::Transient(_) => "Service temporarily unavailable".to_string(),
            AppError::Config(_) | AppError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}

/// Implement Axum's `IntoResponse` for automatic error handling.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.user_message();

        // Full error detail goes to the server log, not the client.
        if status.is_server_error() {
            tracing::error!("[ERROR] {}: {}", self.code(), self);
        } else {
            tracing::debug!("[ERROR] {}: {}", self.code(), self);
        }

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Convert `sqlx::Error` to `AppError`.
///
/// Connectivity failures become `Transient` so callers deny the operation
/// without treating the store as broken forever; a missing row is
/// `NotFound`; everything else is `Internal`.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("record not found".to_string()),
            sqlx::Error::Io(e) => AppError::Transient(format!("store I/O error: {}", e)),
            sqlx::Error::PoolTimedOut => {
                AppError::Transient("store connection pool timed out".to_string())
            }
            sqlx::Error::PoolClosed => AppError::Transient("store connection pool closed".to_string()),
            sqlx::Error::Database(db_err) => {
                AppError::Internal(format!("database error: {}", db_err.message()))
            }
            _ => AppError::Internal(format!("database error: {}", err)),
        }
    }
}

/// Convert `serde_json::Error` to `AppError`.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("malformed JSON: {}", err))
    }
}
