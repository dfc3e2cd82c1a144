//! Application layer - orchestrates domain transitions over the ports.
//!
//! The domain decides what a state or snapshot means; this layer decides
//! when to call the backend and folds the answers back in.

pub mod entitlement;

pub use entitlement::{
    CheckoutCoordinator, CheckoutCoordinatorConfig, EntitlementRuntime, EntitlementStateMachine,
    RuntimeError, DEFAULT_REQUEST_TIMEOUT,
};
