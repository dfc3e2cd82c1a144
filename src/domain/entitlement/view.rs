use serde::Serialize;

use super::{EntitlementSnapshot, EntitlementState};

/// Read model published to the UI layer: current state plus the last
/// trusted snapshot (if any has ever been fetched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitlementView {
    pub state: EntitlementState,
    pub snapshot: Option<EntitlementSnapshot>,
}

impl EntitlementView {
    /// View at process start: nothing known yet.
    pub fn initial() -> Self {
        Self {
            state: EntitlementState::Uninitialized,
            snapshot: None,
        }
    }

    /// Whether the last trusted snapshot says the client is subscribed.
    pub fn is_subscribed(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(EntitlementSnapshot::is_subscribed)
    }
}

impl Default for EntitlementView {
    fn default() -> Self {
        Self::initial()
    }
}
