//! Feature flags configuration

use serde::Deserialize;

/// Feature flags for enabling/disabling functionality
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FeatureFlags {
    /// Allow the backend's activation bypass (requires the `dev-activate`
    /// cargo feature; never in production)
    #[serde(default)]
    pub enable_dev_activate: bool,
}
