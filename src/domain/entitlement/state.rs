//! Entitlement state machine.
//!
//! Steady state is `Subscribed` or `Unsubscribed`. Checkout and cancellation
//! temporarily drive the machine through extra states before folding back.
//!
//! ```text
//! Uninitialized ─► Checking ─► Subscribed ◄──────────┐
//!                     ▲    └─► Unsubscribed          │
//!        (any state) ─┘            │                 │
//!                                  ▼                 │
//!                        CheckoutPending ─► Verifying ┤
//!                                                    │
//!                  Subscribed ─► Cancelling ─► Unsubscribed / Subscribed
//! ```
//!
//! A refresh entered from checkout or cancellation hands the machine back to
//! that operation unless the fetched snapshot settles the question first.

use serde::Serialize;
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Current phase of entitlement reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementState {
    /// Process start; nothing fetched yet.
    Uninitialized,

    /// A status fetch is in flight.
    Checking,

    /// Backend confirmed an active subscription.
    Subscribed,

    /// Backend confirmed no active subscription.
    Unsubscribed,

    /// Checkout created and handed to the browser; not yet polling.
    CheckoutPending,

    /// Polling the backend for checkout completion.
    Verifying,

    /// Cancellation request in flight.
    Cancelling,
}

impl EntitlementState {
    /// Returns true once the machine has settled on a backend-confirmed answer.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            EntitlementState::Subscribed | EntitlementState::Unsubscribed
        )
    }

    /// Returns true while a checkout attempt is outstanding.
    pub fn is_checkout_in_progress(&self) -> bool {
        matches!(
            self,
            EntitlementState::CheckoutPending | EntitlementState::Verifying
        )
    }

    /// Settled state implied by a snapshot's subscription flag.
    pub fn settled_for(is_subscribed: bool) -> Self {
        if is_subscribed {
            EntitlementState::Subscribed
        } else {
            EntitlementState::Unsubscribed
        }
    }
}

impl fmt::Display for EntitlementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntitlementState::Uninitialized => "UNINITIALIZED",
            EntitlementState::Checking => "CHECKING",
            EntitlementState::Subscribed => "SUBSCRIBED",
            EntitlementState::Unsubscribed => "UNSUBSCRIBED",
            EntitlementState::CheckoutPending => "CHECKOUT_PENDING",
            EntitlementState::Verifying => "VERIFYING",
            EntitlementState::Cancelling => "CANCELLING",
        };
        f.write_str(s)
    }
}

impl StateMachine for EntitlementState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use EntitlementState::*;
        matches!(
            (self, target),
            // Explicit refresh re-enters CHECKING from anywhere
            (_, Checking)
            // Snapshot-driven settlement
                | (Checking, Subscribed)
                | (Checking, Unsubscribed)
            // A refresh that interrupted checkout or cancellation hands back
                | (Checking, CheckoutPending)
                | (Checking, Verifying)
                | (Checking, Cancelling)
                | (Subscribed, Subscribed)
                | (Subscribed, Unsubscribed)
                | (Unsubscribed, Subscribed)
                | (Unsubscribed, Unsubscribed)
            // Checkout (a newer attempt supersedes an outstanding one)
                | (Unsubscribed, CheckoutPending)
                | (CheckoutPending, CheckoutPending)
                | (Verifying, CheckoutPending)
                | (CheckoutPending, Verifying)
                | (CheckoutPending, Subscribed)
                | (CheckoutPending, Unsubscribed)
                | (Verifying, Subscribed)
                | (Verifying, Unsubscribed)
            // Cancellation
                | (Subscribed, Cancelling)
                | (Cancelling, Unsubscribed)
                | (Cancelling, Subscribed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use EntitlementState::*;
        match self {
            Uninitialized => vec![Checking],
            Checking => vec![
                Checking,
                Subscribed,
                Unsubscribed,
                CheckoutPending,
                Verifying,
                Cancelling,
            ],
            Subscribed => vec![Checking, Subscribed, Unsubscribed, Cancelling],
            Unsubscribed => vec![Checking, Subscribed, Unsubscribed, CheckoutPending],
            CheckoutPending => vec![Checking, CheckoutPending, Verifying, Subscribed, Unsubscribed],
            Verifying => vec![Checking, CheckoutPending, Subscribed, Unsubscribed],
            Cancelling => vec![Checking, Unsubscribed, Subscribed],
        }
    }
}
