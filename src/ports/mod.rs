//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `EntitlementClient` - Remote subscription backend
//! - `IdentityStore` - Durable anonymous client identity

mod entitlement_client;
mod identity_store;

#[cfg(feature = "dev-activate")]
pub use entitlement_client::DevActivation;
pub use entitlement_client::{ClientError, EntitlementClient, Endpoint};
pub use identity_store::{IdentityStore, IdentityStoreError};
