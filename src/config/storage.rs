//! Identity storage configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Where the client identity is kept
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    /// Identity file path; the platform data directory is used when unset
    #[serde(default)]
    pub identity_path: Option<PathBuf>,
}
