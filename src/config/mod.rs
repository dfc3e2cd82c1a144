//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `ENTITLEMENT_SYNC` prefix and nested values use double underscores as separators.
//!
//! Every section has defaults, so an empty environment yields a working
//! development configuration pointed at a local backend.
//!
//! # Example
//!
//! ```no_run
//! use entitlement_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Backend at {}", config.backend.base_url);
//! ```

mod backend;
mod environment;
mod error;
mod features;
mod polling;
mod storage;

pub use backend::BackendConfig;
pub use environment::{Environment, LogFormat};
pub use error::{ConfigError, ValidationError};
pub use features::FeatureFlags;
pub use polling::PollingConfig;
pub use storage::StorageConfig;

use serde::Deserialize;

/// Environment variable prefix for all settings
pub const ENV_PREFIX: &str = "ENTITLEMENT_SYNC";

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Subscription backend location and request deadline
    #[serde(default)]
    pub backend: BackendConfig,

    /// Checkout polling cadence and cap
    #[serde(default)]
    pub polling: PollingConfig,

    /// Identity file location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Environment name
    #[serde(default)]
    pub environment: Environment,

    /// Log filter directive, used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log line format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Feature flags
    #[serde(default)]
    pub features: FeatureFlags,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `ENTITLEMENT_SYNC` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `ENTITLEMENT_SYNC__BACKEND__BASE_URL=...` -> `backend.base_url = ...`
    /// - `ENTITLEMENT_SYNC__POLLING__MAX_ATTEMPTS=20` -> `polling.max_attempts = 20`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Performs semantic validation of configuration:
    /// - Backend URL format and scheme
    /// - Request deadline and polling bounds
    /// - Production-specific requirements (HTTPS, no dev bypass)
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.backend.validate(self.is_production())?;
        self.polling.validate()?;
        if self.is_production() && self.features.enable_dev_activate {
            return Err(ValidationError::DevActivateInProduction);
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Whether the activation bypass may be wired in
    pub fn dev_activate_allowed(&self) -> bool {
        self.features.enable_dev_activate && !self.is_production()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            polling: PollingConfig::default(),
            storage: StorageConfig::default(),
            environment: Environment::default(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            features: FeatureFlags::default(),
        }
    }
}

fn default_log_level() -> String {
    "info,entitlement_sync=debug".to_string()
}
