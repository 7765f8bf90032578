//! Profile Storage Port - Interface for persisting the profile store.
//!
//! The persisted state is two logical records: the ordered identity list
//! and the active identity id. Adapters write both together.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::ProfileId;
use crate::domain::profile::Profile;

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to serialize state: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize state: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Everything the store needs to rebuild itself after a restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Profiles in insertion order.
    #[serde(default)]
    pub identities: Vec<Profile>,

    #[serde(default)]
    pub active_identity_id: Option<ProfileId>,
}

/// Port for loading and saving the persisted profile state
#[async_trait]
pub trait ProfileStorage: Send + Sync {
    /// Load the last saved state.
    ///
    /// Returns an empty `PersistedState` when nothing has been saved yet.
    async fn load(&self) -> Result<PersistedState, StorageError>;

    /// Replace the saved state with `state`.
    ///
    /// Implementations must not leave a partially written state behind.
    async fn save(&self, state: &PersistedState) -> Result<(), StorageError>;
}
