//! Entitlement error taxonomy.
//!
//! | Error | Recoverable | Effect on cached state |
//! |-------|-------------|------------------------|
//! | StorageUnavailable | no | no entitlement operation possible |
//! | Network | yes | last snapshot retained |
//! | MalformedResponse | yes | last snapshot retained |
//! | CheckoutInitiationFailed | yes | unchanged |
//! | InvalidState | yes | unchanged |
//!
//! A poll that runs out of attempts is `CheckoutOutcome::TimedOut`, not an error.

use thiserror::Error;

use crate::domain::foundation::ErrorCode;
use crate::ports::{ClientError, IdentityStoreError};

/// Errors surfaced to the UI layer by entitlement operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntitlementError {
    /// No durable client identity could be read or written.
    #[error("identity storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    /// Transport failure, timeout, or non-success backend response.
    #[error("network error calling {endpoint}: {cause}")]
    Network { endpoint: String, cause: String },

    /// Backend answered with a body that does not match the endpoint's shape.
    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    /// Checkout could not be started; the user may retry.
    #[error("checkout could not be started: {reason}")]
    CheckoutInitiationFailed { reason: String },

    /// Operation not valid in the current state.
    #[error("cannot {attempted} while {current}")]
    InvalidState { current: String, attempted: String },
}

impl EntitlementError {
    pub fn checkout_initiation_failed(reason: impl Into<String>) -> Self {
        EntitlementError::CheckoutInitiationFailed {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(current: impl ToString, attempted: impl Into<String>) -> Self {
        EntitlementError::InvalidState {
            current: current.to_string(),
            attempted: attempted.into(),
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EntitlementError::StorageUnavailable { .. } => ErrorCode::StorageUnavailable,
            EntitlementError::Network { .. } => ErrorCode::NetworkError,
            EntitlementError::MalformedResponse { .. } => ErrorCode::MalformedResponse,
            EntitlementError::CheckoutInitiationFailed { .. } => {
                ErrorCode::CheckoutInitiationFailed
            }
            EntitlementError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
        }
    }

    /// Whether the caller may retry.
    pub fn is_recoverable(&self) -> bool {
        self.code().is_recoverable()
    }
}

impl From<ClientError> for EntitlementError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Network { endpoint, cause } => EntitlementError::Network {
                endpoint: endpoint.to_string(),
                cause,
            },
            ClientError::MalformedResponse { endpoint, reason } => {
                EntitlementError::MalformedResponse {
                    endpoint: endpoint.to_string(),
                    reason,
                }
            }
        }
    }
}

impl From<IdentityStoreError> for EntitlementError {
    fn from(err: IdentityStoreError) -> Self {
        EntitlementError::StorageUnavailable {
            reason: err.to_string(),
        }
    }
}
