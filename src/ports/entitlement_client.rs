//! Entitlement backend port.
//!
//! Defines the contract for the remote subscription backend. Implementations
//! own no state: every call is a plain request/response.
//!
//! # Design
//!
//! - **Swappable**: the HTTP adapter and the mock adapter share this contract
//! - **Not an error to be unsubscribed**: "no subscription" is a valid snapshot
//! - **Idempotent** except `create_checkout`, which may open a new payment
//!   session on every call

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::domain::entitlement::{CheckoutSession, EntitlementSnapshot};
use crate::domain::foundation::{CheckoutSessionId, ClientIdentity};

/// Port for the remote entitlement backend.
#[async_trait]
pub trait EntitlementClient: Send + Sync {
    /// Fetch the authoritative subscription status.
    async fn fetch_status(
        &self,
        identity: &ClientIdentity,
    ) -> Result<EntitlementSnapshot, ClientError>;

    /// Open a new checkout session with the payment provider.
    ///
    /// NOT idempotent: call at most once per user-initiated attempt.
    async fn create_checkout(&self, identity: &ClientIdentity)
        -> Result<CheckoutSession, ClientError>;

    /// Ask whether a checkout session has completed.
    ///
    /// Safe to repeat: once resolved, the same answer is returned; until then
    /// the snapshot status is `Pending`.
    async fn verify_checkout(
        &self,
        identity: &ClientIdentity,
        session_id: &CheckoutSessionId,
    ) -> Result<EntitlementSnapshot, ClientError>;

    /// Cancel the subscription.
    async fn cancel_subscription(
        &self,
        identity: &ClientIdentity,
    ) -> Result<EntitlementSnapshot, ClientError>;
}

/// Test-only activation bypass exposed by development backends.
///
/// Compiled only with the `dev-activate` feature; never reachable from a
/// default build.
#[cfg(feature = "dev-activate")]
#[async_trait]
pub trait DevActivation: Send + Sync {
    async fn dev_activate(&self, identity: &ClientIdentity) -> Result<(), ClientError>;
}

/// Backend endpoints, for error reporting and URL building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Status,
    CreateCheckout,
    VerifySession,
    Cancel,
    DevActivate,
}

impl Endpoint {
    /// Path relative to the backend base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Status => "status",
            Endpoint::CreateCheckout => "create-checkout",
            Endpoint::VerifySession => "verify-session",
            Endpoint::Cancel => "cancel",
            Endpoint::DevActivate => "dev-activate",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.path())
    }
}

/// Errors from backend calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Transport failure, timeout, non-2xx status, or `success: false`.
    #[error("{endpoint}: {cause}")]
    Network { endpoint: Endpoint, cause: String },

    /// Response body did not match the endpoint's typed shape.
    #[error("{endpoint}: malformed response: {reason}")]
    MalformedResponse { endpoint: Endpoint, reason: String },
}

impl ClientError {
    /// Create a network error.
    pub fn network(endpoint: Endpoint, cause: impl Into<String>) -> Self {
        ClientError::Network {
            endpoint,
            cause: cause.into(),
        }
    }

    /// Create a malformed response error.
    pub fn malformed(endpoint: Endpoint, reason: impl Into<String>) -> Self {
        ClientError::MalformedResponse {
            endpoint,
            reason: reason.into(),
        }
    }

    /// Create the error reported when a call exceeds its deadline.
    pub fn timed_out(endpoint: Endpoint, after: std::time::Duration) -> Self {
        Self::network(endpoint, format!("timed out after {}ms", after.as_millis()))
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            ClientError::Network { endpoint, .. }
            | ClientError::MalformedResponse { endpoint, .. } => *endpoint,
        }
    }

    /// Transient failures are worth retrying within a poll.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network { .. })
    }
}
