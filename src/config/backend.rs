//! Subscription backend configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Subscription backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL the endpoint paths are joined beneath
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Deadline for every backend call, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl BackendConfig {
    /// Deadline applied to each backend call
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check if the backend is reached over TLS
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Validate backend configuration
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.base_url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("backend.base_url"));
        }
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ValidationError::InvalidBackendUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidBackendUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        if production && !self.is_https() {
            return Err(ValidationError::BackendMustBeHttps);
        }
        if !(1..=120).contains(&self.request_timeout_secs) {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8001/api/subscription".to_string()
}

fn default_request_timeout() -> u64 {
    10
}
