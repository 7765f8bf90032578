//! ProfileStore - the single source of truth for profiles and the active pointer.
//!
//! Every mutation is staged on a copy, persisted through the
//! [`ProfileStorage`] port, and only then committed in memory. A failed
//! write therefore leaves both the store and its version untouched.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::foundation::ProfileId;
use crate::domain::profile::{ActiveIdentity, Profile, ProfileDraft, ProfileError, ProfilePatch};
use crate::ports::{PersistedState, ProfileStorage, StorageError};

/// In-memory profile list plus active pointer, backed by a storage port.
pub struct ProfileStore {
    profiles: Vec<Profile>,
    active: ActiveIdentity,
    version: u64,
    storage: Arc<dyn ProfileStorage>,
}

impl ProfileStore {
    /// Rebuild the store from persisted state.
    ///
    /// Records that fail validation or repeat an id are skipped with a
    /// warning. The active pointer is recomputed against what survived.
    pub async fn load(storage: Arc<dyn ProfileStorage>) -> Result<Self, StorageError> {
        let persisted = storage.load().await?;

        let mut seen = HashSet::new();
        let mut profiles = Vec::with_capacity(persisted.identities.len());
        for profile in persisted.identities {
            if let Err(e) = profile.validate() {
                tracing::warn!(profile_id = %profile.id(), error = %e, "Skipping invalid stored profile");
                continue;
            }
            if !seen.insert(profile.id()) {
                tracing::warn!(profile_id = %profile.id(), "Skipping duplicate stored profile");
                continue;
            }
            profiles.push(profile);
        }

        let active = ActiveIdentity::restore(persisted.active_identity_id, |id| seen.contains(id));
        if persisted.active_identity_id.is_some() && !active.is_set() {
            tracing::info!("Stored active identity no longer exists, starting unset");
        }

        tracing::debug!(profiles = profiles.len(), "Profile store loaded");

        Ok(Self {
            profiles,
            active,
            version: 0,
            storage,
        })
    }

    /// Monotonic counter bumped by every effective mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Profiles in insertion order.
    pub fn list(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn get(&self, id: &ProfileId) -> Result<&Profile, ProfileError> {
        self.profiles
            .iter()
            .find(|p| p.id() == *id)
            .ok_or(ProfileError::NotFound(*id))
    }

    pub fn active(&self) -> ActiveIdentity {
        self.active
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        self.active.current().and_then(|id| self.get(&id).ok())
    }

    /// Validate `draft`, assign a fresh id and append the profile.
    pub async fn create(&mut self, draft: ProfileDraft) -> Result<Profile, ProfileError> {
        let profile = Profile::create(self.fresh_id(), draft)?;

        let mut profiles = self.profiles.clone();
        profiles.push(profile.clone());
        self.commit(profiles, self.active).await?;

        Ok(profile)
    }

    /// Merge `patch` into the profile with `id`.
    ///
    /// A patch that changes nothing is accepted without bumping the version.
    pub async fn update(&mut self, id: ProfileId, patch: &ProfilePatch) -> Result<Profile, ProfileError> {
        let index = self.position(&id)?;
        let updated = self.profiles[index].apply(patch)?;
        if updated == self.profiles[index] {
            return Ok(updated);
        }

        let mut profiles = self.profiles.clone();
        profiles[index] = updated.clone();
        self.commit(profiles, self.active).await?;

        Ok(updated)
    }

    /// Remove a profile, clearing the active pointer in the same write if
    /// it referenced this profile.
    pub async fn delete(&mut self, id: ProfileId) -> Result<(), ProfileError> {
        let index = self.position(&id)?;

        let mut profiles = self.profiles.clone();
        profiles.remove(index);
        let mut active = self.active;
        active.on_profile_deleted(&id);
        self.commit(profiles, active).await?;
        Ok(())
    }

    /// Point the active identity at `id`. Returns whether it moved.
    pub async fn select(&mut self, id: ProfileId) -> Result<bool, ProfileError> {
        let mut active = self.active;
        let changed = active.select(id, self.position(&id).is_ok())?;
        if changed {
            self.commit(self.profiles.clone(), active).await?;
        }
        Ok(changed)
    }

    /// Clear the active identity. Returns whether it was set.
    pub async fn deselect(&mut self) -> Result<bool, ProfileError> {
        let mut active = self.active;
        let changed = active.deselect();
        if changed {
            self.commit(self.profiles.clone(), active).await?;
        }
        Ok(changed)
    }

    fn position(&self, id: &ProfileId) -> Result<usize, ProfileError> {
        self.profiles
            .iter()
            .position(|p| p.id() == *id)
            .ok_or(ProfileError::NotFound(*id))
    }

    /// Random v4 id, checked against the live list only. Deleted ids are
    /// not tracked, so the store holds nothing that is not persisted.
    fn fresh_id(&self) -> ProfileId {
        loop {
            let id = ProfileId::new();
            if self.position(&id).is_err() {
                return id;
            }
        }
    }

    async fn commit(&mut self, profiles: Vec<Profile>, active: ActiveIdentity) -> Result<(), ProfileError> {
        let state = PersistedState {
            identities: profiles,
            active_identity_id: active.current(),
        };

        if let Err(e) = self.storage.save(&state).await {
            tracing::error!(error = %e, "Failed to persist profile store");
            return Err(ProfileError::Storage(e.to_string()));
        }

        self.profiles = state.identities;
        self.active = active;
        self.version += 1;
        Ok(())
    }
}
