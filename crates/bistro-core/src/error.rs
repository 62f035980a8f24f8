//! # Error Types
//!
//! Typed error handling for the bistro API.
//! Every operation past the HTTP boundary returns `Result<T, BistroError>`.

use thiserror::Error;

/// Failures raised by a [`Store`](crate::store::Store) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A write collided with an existing document
    #[error("document conflict: {0}")]
    Conflict(String),
}

/// Core error type for all API operations
#[derive(Debug, Error)]
pub enum BistroError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing, malformed or expired bearer token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Valid identity without the required role, or acting on someone else's data
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Document not found
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Price mismatch or invalid amount
    #[error("Invalid price: {message}")]
    InvalidPrice { message: String },

    /// Currency not supported
    #[error("Unsupported currency: {currency}")]
    UnsupportedCurrency { currency: String },

    /// Payment gateway API error
    #[error("Gateway error [{provider}]: {message}")]
    Gateway { provider: String, message: String },

    /// Network/HTTP error communicating with the gateway
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Document store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Payment was written but the checkout did not finish; reconciliation will complete it
    #[error("Payment {payment_id} recorded as pending: {message}")]
    PartialFailure { payment_id: String, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BistroError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        BistroError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Returns true if the caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BistroError::NetworkError(_)
                | BistroError::Gateway { .. }
                | BistroError::PartialFailure { .. }
                | BistroError::Storage(StoreError::Unavailable(_))
        )
    }

    /// Returns true for errors whose details must not reach the client.
    /// `PartialFailure` carries only the payment id and a fixed message.
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500 && !matches!(self, BistroError::PartialFailure { .. })
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            BistroError::Configuration(_) => 500,
            BistroError::InvalidRequest(_) => 400,
            BistroError::Unauthorized(_) => 401,
            BistroError::Forbidden(_) => 403,
            BistroError::NotFound { .. } => 404,
            BistroError::InvalidPrice { .. } => 400,
            BistroError::UnsupportedCurrency { .. } => 400,
            BistroError::Gateway { .. } => 502,
            BistroError::NetworkError(_) => 503,
            BistroError::Storage(_) => 500,
            BistroError::PartialFailure { .. } => 503,
            BistroError::Serialization(_) => 500,
            BistroError::Internal(_) => 500,
        }
    }
}

/// Result type alias for API operations
pub type BistroResult<T> = Result<T, BistroError>;

/// Result type alias for store primitives
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(BistroError::NetworkError("timeout".into()).is_retryable());
        assert!(BistroError::PartialFailure {
            payment_id: "p1".into(),
            message: "cart delete failed".into()
        }
        .is_retryable());
        assert!(BistroError::Storage(StoreError::Unavailable("down".into())).is_retryable());
        assert!(!BistroError::Storage(StoreError::Conflict("dup".into())).is_retryable());
        assert!(!BistroError::Forbidden("nope".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(BistroError::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(BistroError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(BistroError::not_found("menu item", "m1").status_code(), 404);
        assert_eq!(
            BistroError::Storage(StoreError::Unavailable("x".into())).status_code(),
            500
        );
        assert_eq!(
            BistroError::PartialFailure {
                payment_id: "p".into(),
                message: "m".into()
            }
            .status_code(),
            503
        );
    }

    #[test]
    fn test_storage_is_distinct_from_auth() {
        let err: BistroError = StoreError::Unavailable("down".into()).into();
        assert!(matches!(err, BistroError::Storage(_)));
        assert!(err.is_internal());
        assert!(!BistroError::Forbidden("x".into()).is_internal());
    }

    #[test]
    fn test_not_found_message() {
        let err = BistroError::not_found("user", "abc");
        assert_eq!(err.to_string(), "user not found: abc");
    }
}
