//! Identity Store Port - durable anonymous client identity.

use async_trait::async_trait;

use crate::domain::foundation::ClientIdentity;

/// Errors that can occur while reading or writing the identity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityStoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Identity record is corrupt: {0}")]
    Corrupt(String),

    #[error("Failed to serialize identity: {0}")]
    SerializationFailed(String),
}

/// Port for the installation's durable identity
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Return the stored identity, creating and persisting one on first call.
    ///
    /// Idempotent. The identity is written exactly once; an unreadable record
    /// is reported, never silently replaced.
    ///
    /// # Errors
    /// Returns `IdentityStoreError` if the persistence layer cannot be read
    /// or written. Callers treat this as fatal for entitlement operations.
    async fn get_or_create_identity(&self) -> Result<ClientIdentity, IdentityStoreError>;
}
