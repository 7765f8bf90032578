//! Error vocabulary shared by the profile domain and the broker.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// A rejected field value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("Exactly one of '{first}' or '{second}' must be provided")]
    ExactlyOneRequired { first: String, second: String },
}

impl ValidationError {
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a mutual-exclusivity error for a pair of fields.
    pub fn exactly_one(first: impl Into<String>, second: impl Into<String>) -> Self {
        ValidationError::ExactlyOneRequired {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Name of the offending field, if the error is about a single one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::EmptyField { field } | ValidationError::InvalidFormat { field, .. } => {
                Some(field)
            }
            ValidationError::ExactlyOneRequired { .. } => None,
        }
    }
}

/// Error codes reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ValidationFailed,
    InvalidPayload,
    ProfileNotFound,
    StorageFailed,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::InvalidPayload => "INVALID_PAYLOAD",
            ErrorCode::ProfileNotFound => "PROFILE_NOT_FOUND",
            ErrorCode::StorageFailed => "STORAGE_FAILED",
        })
    }
}

/// What a client sees when a command fails.
#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}")]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        let field = err.field().map(str::to_string);
        let error = DomainError::new(ErrorCode::ValidationFailed, err.to_string());
        match field {
            Some(field) => error.with_detail("field", field),
            None => error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_names_the_field() {
        let err = ValidationError::empty_field("displayName");
        assert_eq!(err.to_string(), "Field 'displayName' cannot be empty");
    }

    #[test]
    fn exactly_one_names_both_fields() {
        let err = ValidationError::exactly_one("idp", "webID");
        assert_eq!(
            format!("{}", err),
            "Exactly one of 'idp' or 'webID' must be provided"
        );
        assert_eq!(err.field(), None);
    }

    #[test]
    fn domain_error_prefixes_wire_code() {
        let err = DomainError::new(ErrorCode::ProfileNotFound, "Profile not found");
        assert_eq!(err.to_string(), "[PROFILE_NOT_FOUND] Profile not found");
    }

    #[test]
    fn validation_failure_keeps_field_detail() {
        let err: DomainError = ValidationError::invalid_format("webID", "not a URI").into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details.get("field"), Some(&"webID".to_string()));
    }

    #[test]
    fn error_codes_render_screaming_snake() {
        assert_eq!(format!("{}", ErrorCode::StorageFailed), "STORAGE_FAILED");
        assert_eq!(format!("{}", ErrorCode::InvalidPayload), "INVALID_PAYLOAD");
    }
}
