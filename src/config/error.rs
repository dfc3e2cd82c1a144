//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid backend URL: {0}")]
    InvalidBackendUrl(String),

    #[error("Backend URL must use HTTPS in production")]
    BackendMustBeHttps,

    #[error("Invalid request timeout (must be 1..=120 seconds)")]
    InvalidTimeout,

    #[error("Invalid poll interval (must be greater than zero)")]
    InvalidPollInterval,

    #[error("Invalid max poll attempts (must be 1..=1000)")]
    InvalidMaxAttempts,

    #[error("Dev activation must not be enabled in production")]
    DevActivateInProduction,
}
