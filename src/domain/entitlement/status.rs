//! Backend subscription status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Subscription status as reported by the backend.
///
/// Only `Active` entitles the client to premium features. Every other
/// status is treated as "not subscribed" for gating purposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No subscription has ever been recorded for this client.
    #[default]
    None,

    /// Paid and current.
    Active,

    /// Checkout started but payment not yet confirmed.
    Pending,

    /// Cancelled by the user.
    Cancelled,

    /// Ended (lapsed payment or period end).
    Expired,
}

impl SubscriptionStatus {
    /// Returns true if this status entitles the client to premium features.
    pub fn grants_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }

    /// Wire representation, as sent by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    /// Parses the backend's status string.
    ///
    /// Accepts the US spelling `canceled` used by payment providers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "inactive" => Ok(SubscriptionStatus::None),
            "active" => Ok(SubscriptionStatus::Active),
            "pending" => Ok(SubscriptionStatus::Pending),
            "cancelled" | "canceled" => Ok(SubscriptionStatus::Cancelled),
            "expired" => Ok(SubscriptionStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown subscription status '{}'", other),
            )),
        }
    }
}
