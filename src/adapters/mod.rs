//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `backend` - Subscription backend clients (HTTP, mock)
//! - `storage` - Client identity stores (file, in-memory)

pub mod backend;
pub mod storage;

pub use backend::{BackendClientConfig, HttpEntitlementClient, MockEntitlementClient};
pub use storage::{FileIdentityStore, InMemoryIdentityStore};
