//! In-Memory Profile Storage Adapter
//!
//! Keeps the persisted state in memory. Used by tests and by the
//! `memory` storage backend.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ports::{PersistedState, ProfileStorage, StorageError};

/// In-memory storage for the profile state
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileStorage {
    state: Arc<RwLock<PersistedState>>,
}

impl InMemoryProfileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing state (useful for tests)
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Copy of the last saved state
    pub async fn snapshot(&self) -> PersistedState {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl ProfileStorage for InMemoryProfileStorage {
    async fn load(&self) -> Result<PersistedState, StorageError> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        *self.state.write().await = state.clone();
        Ok(())
    }
}
