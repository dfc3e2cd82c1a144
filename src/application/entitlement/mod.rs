//! Entitlement application services.
//!
//! - `EntitlementStateMachine` - owns the state, the cached snapshot and every transition
//! - `CheckoutCoordinator` - checkout initiation, completion polling, cancellation
//! - `EntitlementRuntime` - wires both from `AppConfig`

mod checkout_coordinator;
mod deadline;
mod runtime;
mod state_machine;

pub use checkout_coordinator::{CheckoutCoordinator, CheckoutCoordinatorConfig};
pub use runtime::{EntitlementRuntime, RuntimeError};
pub use state_machine::{EntitlementStateMachine, DEFAULT_REQUEST_TIMEOUT};
