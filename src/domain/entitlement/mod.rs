//! Entitlement domain module.
//!
//! Answers "is this installation entitled to premium features" from
//! backend-confirmed snapshots.
//!
//! # Module Structure
//!
//! - `status` - SubscriptionStatus as reported by the backend
//! - `snapshot` - EntitlementSnapshot, the cached server truth
//! - `state` - EntitlementState state machine
//! - `checkout` - Transient checkout session and poll attempt values
//! - `access_gate` - Fail-closed render decision
//! - `errors` - EntitlementError taxonomy

mod access_gate;
mod checkout;
mod errors;
mod snapshot;
mod state;
mod status;
mod view;

pub use access_gate::{AccessDecision, AccessGate};
pub use checkout::{CheckoutOutcome, CheckoutSession, ExternalUrl, PollAttempt, PollGeneration};
pub use errors::EntitlementError;
pub use snapshot::EntitlementSnapshot;
pub use state::EntitlementState;
pub use status::SubscriptionStatus;
pub use view::EntitlementView;
