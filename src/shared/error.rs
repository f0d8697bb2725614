//! Shared Error Types
//!
//! Errors raised while decoding or validating client payloads. They carry no
//! server-side context, so both the socket layer and the HTTP handlers can
//! surface them to the client verbatim.
//!
//! # Usage
//!
//! ```rust
//! use chatgate::shared::error::SharedError;
//!
//! let error = SharedError::validation("content", "must not be empty");
//! assert_eq!(error.field(), Some("content"));
//! ```
use thiserror::Error;

/// Client payload errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// The frame could not be decoded as a known intent
    #[error("Malformed payload: {message}")]
    MalformedPayload {
        /// Decoder message
        message: String,
    },

    /// A decoded field violates a constraint
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    /// Create a new malformed payload error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Field name for validation errors
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ValidationError { field, .. } => Some(field),
            Self::MalformedPayload { .. } => None,
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = SharedError::validation("content", "must not be empty");
        assert_eq!(error.field(), Some("content"));
        assert_eq!(
            error.to_string(),
            "Validation error in field 'content': must not be empty"
        );
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: SharedError = json_err.into();
        assert!(matches!(error, SharedError::MalformedPayload { .. }));
        assert_eq!(error.field(), None);
    }
}
