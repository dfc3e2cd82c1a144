//! Render gate for premium screens.
//!
//! Fail-closed: access is denied unless the state is exactly `Subscribed`.
//! In-progress states (`CheckoutPending`, `Verifying`, `Cancelling`) still
//! show the paywall.

use serde::Serialize;

use super::{EntitlementState, EntitlementView};

/// What a premium screen should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    ShowLoading,
    ShowTool,
    ShowPaywall,
}

impl AccessDecision {
    /// Returns true if the premium tool may be rendered.
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::ShowTool)
    }

    /// Get a user-facing message for the decision.
    pub fn user_message(&self) -> &'static str {
        match self {
            AccessDecision::ShowLoading => "Checking your subscription...",
            AccessDecision::ShowTool => "Subscription active.",
            AccessDecision::ShowPaywall => "A subscription is required to use this tool.",
        }
    }
}

impl std::fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.user_message())
    }
}

/// Pure derived-state gate consumed by screens.
pub struct AccessGate;

impl AccessGate {
    /// Decide what to render for `(state, is_loading)`.
    pub fn decide(state: EntitlementState, is_loading: bool) -> AccessDecision {
        match state {
            _ if is_loading => AccessDecision::ShowLoading,
            EntitlementState::Uninitialized | EntitlementState::Checking => {
                AccessDecision::ShowLoading
            }
            EntitlementState::Subscribed => AccessDecision::ShowTool,
            EntitlementState::Unsubscribed
            | EntitlementState::CheckoutPending
            | EntitlementState::Verifying
            | EntitlementState::Cancelling => AccessDecision::ShowPaywall,
        }
    }

    /// Decide for a published view, with no extra UI loading.
    pub fn for_view(view: &EntitlementView) -> AccessDecision {
        Self::decide(view.state, false)
    }
}
