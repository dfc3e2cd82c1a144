//! Server-confirmed entitlement snapshot.

use serde::Serialize;

use super::SubscriptionStatus;
use crate::domain::foundation::Timestamp;

/// The last known server-confirmed entitlement record.
///
/// Immutable: a newer fetch replaces the whole snapshot. `is_subscribed` is
/// derived from `status` at construction, so it is true only when the status
/// is `Active`.
///
/// `fetched_at` is the moment the request that produced this snapshot was
/// *issued*, so a response from an older request always carries an older
/// stamp than one from a newer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitlementSnapshot {
    is_subscribed: bool,
    status: SubscriptionStatus,
    fetched_at: Timestamp,
}

impl EntitlementSnapshot {
    /// Creates a snapshot for a status observed at `fetched_at`.
    pub fn new(status: SubscriptionStatus, fetched_at: Timestamp) -> Self {
        Self {
            is_subscribed: status.grants_access(),
            status,
            fetched_at,
        }
    }

    /// Whether the client is entitled to premium features.
    pub fn is_subscribed(&self) -> bool {
        self.is_subscribed
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    pub fn fetched_at(&self) -> Timestamp {
        self.fetched_at
    }

    /// True if this snapshot may replace `current` (never regress in time).
    pub fn supersedes(&self, current: &EntitlementSnapshot) -> bool {
        !self.fetched_at.is_before(&current.fetched_at)
    }
}
