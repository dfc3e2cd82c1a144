//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (identifiers, timestamps, errors)
//! - `entitlement` - Subscription snapshots, the entitlement state machine and the access gate

pub mod entitlement;
pub mod foundation;
