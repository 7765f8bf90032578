//! Errors raised by profile operations.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ProfileId, ValidationError};

/// Failure of a store or state machine operation.
#[derive(Debug, Clone, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Profile not found: {0}")]
    NotFound(ProfileId),

    #[error("Failed to persist profiles: {0}")]
    Storage(String),
}

impl ProfileError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ProfileError::Validation(_) => ErrorCode::ValidationFailed,
            ProfileError::NotFound(_) => ErrorCode::ProfileNotFound,
            ProfileError::Storage(_) => ErrorCode::StorageFailed,
        }
    }
}

impl From<ProfileError> for DomainError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::Validation(inner) => inner.into(),
            ProfileError::NotFound(id) => {
                DomainError::new(ErrorCode::ProfileNotFound, format!("Profile not found: {}", id))
                    .with_detail("id", id.to_string())
            }
            ProfileError::Storage(reason) => DomainError::new(ErrorCode::StorageFailed, reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_profile_not_found_code() {
        let id = ProfileId::new();
        let err: DomainError = ProfileError::NotFound(id).into();
        assert_eq!(err.code, ErrorCode::ProfileNotFound);
        assert_eq!(err.details.get("id"), Some(&id.to_string()));
    }

    #[test]
    fn validation_is_displayed_transparently() {
        let err = ProfileError::from(ValidationError::empty_field("displayName"));
        assert_eq!(err.to_string(), "Field 'displayName' cannot be empty");
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }
}
