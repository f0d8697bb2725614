/**
 * Gateway Error Types
 *
 * The error taxonomy shared by the socket gateway and the HTTP query API.
 *
 * # Error Kinds
 *
 * - `Unauthorized` - missing or rejected credential
 * - `NotFound` - a referenced user, message or group does not exist
 * - `Forbidden` - the caller exists but may not act on the target
 * - `Conflict` - the write collides with existing state (already a member)
 * - `Invalid` - the payload is malformed or fails validation
 * - `Internal` - the store failed or timed out
 *
 * Domain errors carry a client-safe reason. `Internal` never exposes its
 * cause to clients; it is logged where it is rendered.
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::store::StoreError;
use crate::shared::SharedError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid: {0}")]
    Invalid(String),

    /// Store failure or timeout
    #[error("Internal error: {0}")]
    Internal(StoreError),
}

impl GatewayError {
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound(reason.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `Unauthorized` - 401
    /// - `NotFound` - 404
    /// - `Forbidden` - 403
    /// - `Conflict` - 409
    /// - `Invalid` - 400
    /// - `Internal` - 500, or 503 when the store timed out
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Internal(StoreError::Timeout(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable kind, sent as `code` in socket error frames
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::Invalid(_) => "invalid",
            Self::Internal(_) => "internal",
        }
    }

    /// Client-facing message
    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized(reason)
            | Self::NotFound(reason)
            | Self::Forbidden(reason)
            | Self::Conflict(reason)
            | Self::Invalid(reason) => reason.clone(),
            Self::Internal(StoreError::Timeout(_)) => "Service temporarily unavailable".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => Self::conflict("Resource already exists"),
            StoreError::MissingReference(_) => Self::not_found("Referenced resource not found"),
            other => Self::Internal(other),
        }
    }
}

impl From<SharedError> for GatewayError {
    fn from(err: SharedError) -> Self {
        Self::Invalid(err.to_string())
    }
}
