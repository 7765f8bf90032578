//! Active-identity pointer and its transition rules.
//!
//! The pointer only ever references a profile by id. Existence checks are
//! delegated to the caller (the store), so the state machine never needs
//! to see the profile list itself.

use crate::domain::foundation::ProfileId;

use super::ProfileError;

/// Which profile, if any, consumers should currently use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveIdentity {
    #[default]
    Unset,
    Active(ProfileId),
}

impl ActiveIdentity {
    /// Recomputes the pointer on cold start.
    ///
    /// A persisted id that no longer resolves yields `Unset`.
    pub fn restore(persisted: Option<ProfileId>, resolves: impl Fn(&ProfileId) -> bool) -> Self {
        match persisted {
            Some(id) if resolves(&id) => ActiveIdentity::Active(id),
            _ => ActiveIdentity::Unset,
        }
    }

    /// Moves to `Active(id)` from any state.
    ///
    /// Returns whether the pointer changed; reselecting the active id is
    /// accepted and reports `false`.
    pub fn select(&mut self, id: ProfileId, resolves: bool) -> Result<bool, ProfileError> {
        if !resolves {
            return Err(ProfileError::NotFound(id));
        }
        let changed = *self != ActiveIdentity::Active(id);
        *self = ActiveIdentity::Active(id);
        Ok(changed)
    }

    /// Moves to `Unset` unconditionally. Returns whether anything changed.
    pub fn deselect(&mut self) -> bool {
        let changed = self.is_set();
        *self = ActiveIdentity::Unset;
        changed
    }

    /// Clears the pointer if it referenced the deleted profile.
    pub fn on_profile_deleted(&mut self, id: &ProfileId) -> bool {
        if self.current() == Some(*id) {
            *self = ActiveIdentity::Unset;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<ProfileId> {
        match self {
            ActiveIdentity::Active(id) => Some(*id),
            ActiveIdentity::Unset => None,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, ActiveIdentity::Active(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_keeps_resolvable_pointer() {
        let id = ProfileId::new();
        assert_eq!(
            ActiveIdentity::restore(Some(id), |candidate| *candidate == id),
            ActiveIdentity::Active(id)
        );
    }

    #[test]
    fn restore_drops_dangling_pointer() {
        let state = ActiveIdentity::restore(Some(ProfileId::new()), |_| false);
        assert_eq!(state, ActiveIdentity::Unset);
        assert_eq!(ActiveIdentity::restore(None, |_| true), ActiveIdentity::Unset);
    }

    #[test]
    fn select_unknown_id_fails_and_leaves_state() {
        let existing = ProfileId::new();
        let mut state = ActiveIdentity::Active(existing);
        let missing = ProfileId::new();

        let err = state.select(missing, false).unwrap_err();
        assert!(matches!(err, ProfileError::NotFound(id) if id == missing));
        assert_eq!(state, ActiveIdentity::Active(existing));
    }

    #[test]
    fn reselect_is_idempotent() {
        let id = ProfileId::new();
        let mut state = ActiveIdentity::Unset;
        assert!(state.select(id, true).unwrap());
        assert!(!state.select(id, true).unwrap());
        assert_eq!(state.current(), Some(id));
    }

    #[test]
    fn deselect_always_ends_unset() {
        let mut state = ActiveIdentity::Active(ProfileId::new());
        assert!(state.deselect());
        assert!(!state.deselect());
        assert!(!state.is_set());
    }

    #[test]
    fn deleting_active_profile_clears_pointer() {
        let id = ProfileId::new();
        let mut state = ActiveIdentity::Active(id);
        assert!(!state.on_profile_deleted(&ProfileId::new()));
        assert_eq!(state.current(), Some(id));
        assert!(state.on_profile_deleted(&id));
        assert_eq!(state, ActiveIdentity::Unset);
    }
}
