//! File-based Profile Storage Adapter
//!
//! Stores the identity list and active pointer in a single YAML file.
//! Writes go to a temporary sibling file which is then renamed over the
//! original, so a crash never leaves a half-written state behind.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::foundation::ProfileId;
use crate::domain::profile::Profile;
use crate::ports::{PersistedState, ProfileStorage, StorageError};

/// On-disk shape, decoded leniently so one bad record does not hide the rest.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    #[serde(default)]
    identities: Vec<serde_yaml::Value>,
    #[serde(default)]
    active_identity_id: Option<ProfileId>,
}

/// YAML file storage for profiles
#[derive(Debug, Clone)]
pub struct FileProfileStorage {
    path: PathBuf,
}

impl FileProfileStorage {
    /// Create a storage backed by the file at `path`.
    ///
    /// The file and its parent directories are created on first save.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("yaml.tmp")
    }
}

#[async_trait]
impl ProfileStorage for FileProfileStorage {
    async fn load(&self) -> Result<PersistedState, StorageError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No profile file yet, starting empty");
            return Ok(PersistedState::default());
        }

        let yaml = fs::read_to_string(&self.path)
            .await
            .map_err(|e| StorageError::IoError(e.to_string()))?;

        if yaml.trim().is_empty() {
            return Ok(PersistedState::default());
        }

        let stored: StoredState = serde_yaml::from_str(&yaml)
            .map_err(|e| StorageError::DeserializationFailed(e.to_string()))?;

        let mut identities = Vec::with_capacity(stored.identities.len());
        for (index, raw) in stored.identities.into_iter().enumerate() {
            match serde_yaml::from_value::<Profile>(raw) {
                Ok(profile) => identities.push(profile),
                Err(e) => tracing::warn!(index, error = %e, "Skipping unreadable stored profile"),
            }
        }

        Ok(PersistedState {
            identities,
            active_identity_id: stored.active_identity_id,
        })
    }

    async fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::IoError(e.to_string()))?;
        }

        let yaml = serde_yaml::to_string(state)
            .map_err(|e| StorageError::SerializationFailed(e.to_string()))?;

        // Write file atomically using a temporary file
        let temp_path = self.temp_path();
        fs::write(&temp_path, yaml)
            .await
            .map_err(|e| StorageError::IoError(format!("Failed to write temporary file: {}", e)))?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StorageError::IoError(format!("Failed to rename file: {}", e)))?;

        Ok(())
    }
}
