//! Error types for the service
//!
//! Two layers: [`StoreError`] is raised at a storage-tier boundary and never
//! leaves the cache or rate-limit coordinators; [`ApiError`] is what a
//! request handler returns and maps onto an HTTP response.

use std::fmt::Display;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extract::FetchError;

// == Store Error Enum ==
/// Failure of a fast or durable tier call.
///
/// A reachable store answering "no such key" is not an error; it is reported
/// as `Ok(None)` by the store traits.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Connection refused, command failed, tier disabled
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer within its call bound
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    /// Stored bytes could not be encoded or decoded
    #[error("codec error: {0}")]
    Codec(String),
}

impl StoreError {
    pub fn unavailable(err: impl Display) -> Self {
        StoreError::Unavailable(err.to_string())
    }

    pub fn codec(err: impl Display) -> Self {
        StoreError::Codec(err.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Result type for storage-tier calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == API Error Enum ==
/// Unified error type for request handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Window exhausted for the caller's identity
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64 },

    /// Invalid request data
    #[error("{0}")]
    InvalidRequest(String),

    /// Missing, unknown, inactive or expired API key
    #[error("{0}")]
    Unauthorized(String),

    /// API key lacks the permission for this endpoint
    #[error("{0}")]
    Forbidden(String),

    /// The origin did not answer before the fetch timeout
    #[error("Request timeout")]
    FetchTimeout,

    /// The origin answered with something unusable
    #[error("{0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::FetchTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout => ApiError::FetchTimeout,
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::RateLimited { retry_after } => json!({
                "success": false,
                "error": self.to_string(),
                "retryAfter": retry_after,
            }),
            _ => json!({
                "success": false,
                "error": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for request handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
