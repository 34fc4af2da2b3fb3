//! Error types for the service core
//!
//! Provides unified error handling using thiserror. A cache miss is never an
//! error here: it only triggers a fallback to the persistent store.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Core Error Enum ==
/// Unified error type for the caching, session and rate-limiting core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Key absent in both the cache and the persistent store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persistent store call failed or timed out
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// No live session for the presented token
    #[error("Session not found")]
    SessionNotFound,

    /// Session row exists but has been idle past its lifetime
    #[error("Session expired")]
    SessionExpired,

    /// Client exhausted its request budget
    #[error("Rate limit exceeded for {0}")]
    RateLimited(String),

    /// Record failed boundary validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Caller is authenticated but lacks rights for the action
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl CoreError {
    /// HTTP status the handler layer reports for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::SessionNotFound | CoreError::SessionExpired => StatusCode::UNAUTHORIZED,
            CoreError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            CoreError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string()
        }));

        if let CoreError::RateLimited(_) = self {
            return (status, [(header::RETRY_AFTER, "1")], body).into_response();
        }

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the service core.
pub type Result<T> = std::result::Result<T, CoreError>;
