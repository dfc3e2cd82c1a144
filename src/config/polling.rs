//! Checkout polling configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::CheckoutCoordinatorConfig;

/// How the checkout coordinator polls for completion
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Seconds to wait before each verify call
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Verify calls per polling run before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Upper bound on one polling run, excluding request deadlines
    pub fn max_wait(&self) -> Duration {
        self.interval() * self.max_attempts
    }

    /// Coordinator settings derived from this section
    pub fn coordinator_config(&self) -> CheckoutCoordinatorConfig {
        CheckoutCoordinatorConfig::default()
            .with_poll_interval(self.interval())
            .with_max_attempts(self.max_attempts)
    }

    /// Validate polling configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_secs == 0 {
            return Err(ValidationError::InvalidPollInterval);
        }
        if !(1..=1000).contains(&self.max_attempts) {
            return Err(ValidationError::InvalidMaxAttempts);
        }
        Ok(())
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_interval() -> u64 {
    3
}

fn default_max_attempts() -> u32 {
    100
}
