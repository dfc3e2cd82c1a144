//! Storage Adapters
//!
//! Implementations of the IdentityStore port.
//!
//! ## Available Adapters
//!
//! - **FileIdentityStore** - Stores the identity as a YAML file on disk
//! - **InMemoryIdentityStore** - Keeps the identity in memory (testing/development)
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::{FileIdentityStore, InMemoryIdentityStore};
//!
//! // Production: file-based storage
//! let store = FileIdentityStore::new("./data/identity.yaml");
//!
//! // Testing: in-memory storage
//! let store = InMemoryIdentityStore::new();
//! ```

mod file_identity_store;
mod in_memory_identity_store;

pub use file_identity_store::FileIdentityStore;
pub use in_memory_identity_store::InMemoryIdentityStore;
