//! File-based Identity Store Adapter
//!
//! Persists the client identity as a small YAML document on disk.
//! The record is written to a temp file and published with a hard link, so
//! the identity file is never seen half-written and concurrent first launches
//! converge on whichever identity reached the disk first.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::foundation::{ClientIdentity, Timestamp};
use crate::ports::{IdentityStore, IdentityStoreError};

const APP_DIR: &str = "entitlement-sync";
const IDENTITY_FILE: &str = "identity.yaml";

/// On-disk identity record
#[derive(Debug, Serialize, Deserialize)]
struct IdentityRecord {
    client_id: ClientIdentity,
    created_at: Timestamp,
}

/// File-based storage for the client identity
#[derive(Debug)]
pub struct FileIdentityStore {
    path: PathBuf,
    /// Serializes first creation within this process and caches the result.
    cached: Mutex<Option<ClientIdentity>>,
}

impl FileIdentityStore {
    /// Create a store backed by the given file
    ///
    /// # Example
    /// ```ignore
    /// let store = FileIdentityStore::new("./data/identity.yaml");
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cached: Mutex::new(None),
        }
    }

    /// Platform data directory location, e.g. `~/.local/share/entitlement-sync/identity.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(APP_DIR).join(IDENTITY_FILE))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_existing(&self) -> Result<Option<ClientIdentity>, IdentityStoreError> {
        let yaml = match fs::read_to_string(&self.path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(IdentityStoreError::Io(e.to_string())),
        };

        let record: IdentityRecord = serde_yaml::from_str(&yaml)
            .map_err(|e| IdentityStoreError::Corrupt(format!("{}: {}", self.path.display(), e)))?;

        Ok(Some(record.client_id))
    }

    /// Sibling temp file unique to this attempt.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| IDENTITY_FILE.into());
        name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }

    async fn create_new(&self) -> Result<ClientIdentity, IdentityStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| IdentityStoreError::Io(e.to_string()))?;
        }

        let record = IdentityRecord {
            client_id: ClientIdentity::generate(),
            created_at: Timestamp::now(),
        };
        let yaml = serde_yaml::to_string(&record)
            .map_err(|e| IdentityStoreError::SerializationFailed(e.to_string()))?;

        // Write the full record aside, then publish it with a hard link so the
        // identity file is either absent or complete.
        let temp_path = self.temp_path();
        let published = match write_synced(&temp_path, yaml.as_bytes()).await {
            Ok(()) => fs::hard_link(&temp_path, &self.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = fs::remove_file(&temp_path).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    path = %temp_path.display(),
                    error = %e,
                    "Failed to remove temporary identity file"
                );
            }
        }

        match published {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Created new client identity");
                Ok(record.client_id)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // Another process won the race; adopt its identity.
                self.read_existing().await?.ok_or_else(|| {
                    IdentityStoreError::Corrupt("identity file disappeared during creation".into())
                })
            }
            Err(e) => Err(IdentityStoreError::Io(e.to_string())),
        }
    }
}

async fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn get_or_create_identity(&self) -> Result<ClientIdentity, IdentityStoreError> {
        let mut cached = self.cached.lock().await;
        if let Some(identity) = cached.as_ref() {
            return Ok(identity.clone());
        }

        let identity = match self.read_existing().await? {
            Some(identity) => identity,
            None => self.create_new().await?,
        };

        *cached = Some(identity.clone());
        Ok(identity)
    }
}
