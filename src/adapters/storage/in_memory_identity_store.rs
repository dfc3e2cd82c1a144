//! In-Memory Identity Store Adapter
//!
//! Keeps the identity in memory only. Useful for testing and for
//! ephemeral sessions where nothing may touch the disk.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::ClientIdentity;
use crate::ports::{IdentityStore, IdentityStoreError};

/// In-memory storage for the client identity
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityStore {
    identity: Arc<RwLock<Option<ClientIdentity>>>,
    unavailable: bool,
}

impl InMemoryIdentityStore {
    /// Create an empty store; the first call generates an identity
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `identity`
    pub fn with_identity(identity: ClientIdentity) -> Self {
        Self {
            identity: Arc::new(RwLock::new(Some(identity))),
            unavailable: false,
        }
    }

    /// Create a store whose persistence layer always fails (for testing)
    pub fn unavailable() -> Self {
        Self {
            identity: Arc::new(RwLock::new(None)),
            unavailable: true,
        }
    }

    /// Current identity without creating one
    pub async fn peek(&self) -> Option<ClientIdentity> {
        self.identity.read().await.clone()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn get_or_create_identity(&self) -> Result<ClientIdentity, IdentityStoreError> {
        if self.unavailable {
            return Err(IdentityStoreError::Io("storage unavailable".into()));
        }

        let mut identity = self.identity.write().await;
        Ok(identity.get_or_insert_with(ClientIdentity::generate).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_identity_lazily_once() {
        let store = InMemoryIdentityStore::new();
        assert!(store.peek().await.is_none());

        let first = store.get_or_create_identity().await.unwrap();
        let second = store.get_or_create_identity().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.peek().await, Some(first));
    }

    #[tokio::test]
    async fn seeded_identity_is_returned() {
        let id = ClientIdentity::new("U1").unwrap();
        let store = InMemoryIdentityStore::with_identity(id.clone());
        assert_eq!(store.get_or_create_identity().await.unwrap(), id);
    }

    #[tokio::test]
    async fn unavailable_store_fails() {
        let store = InMemoryIdentityStore::unavailable();
        assert!(store.get_or_create_identity().await.is_err());
    }
}
