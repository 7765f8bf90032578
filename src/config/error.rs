//! Configuration errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Could not read .env file: {0}")]
    DotEnv(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A loaded value that is well-typed but unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Port must be non-zero")]
    InvalidPort,

    #[error("Unknown log format '{0}' (expected 'pretty' or 'json')")]
    UnknownLogFormat(String),

    #[error("Storage path must not be empty for the file backend")]
    EmptyStoragePath,
}
