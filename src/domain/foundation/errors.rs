//! Error types for the domain layer.

use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Stable error codes surfaced to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // State errors
    InvalidStateTransition,

    // Entitlement errors
    StorageUnavailable,
    NetworkError,
    MalformedResponse,
    CheckoutInitiationFailed,
}

impl ErrorCode {
    /// Whether the user can sensibly retry the failed operation.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ErrorCode::StorageUnavailable)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::StorageUnavailable => "STORAGE_UNAVAILABLE",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::MalformedResponse => "MALFORMED_RESPONSE",
            ErrorCode::CheckoutInitiationFailed => "CHECKOUT_INITIATION_FAILED",
        };
        write!(f, "{}", s)
    }
}
