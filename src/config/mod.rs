//! Typed configuration for the broker daemon.
//!
//! Values come from the process environment (after an optional `.env`),
//! prefixed with `IDENTITY_BROKER` and nested with `__`:
//!
//! - `IDENTITY_BROKER__SERVER__PORT=9000` sets `server.port`
//! - `IDENTITY_BROKER__STORAGE__BACKEND=memory` sets `storage.backend`
//!
//! ```no_run
//! use identity_broker::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! config.validate()?;
//! println!("listening on {}", config.server.socket_addr());
//! # Ok(())
//! # }
//! ```

mod broker;
mod error;
mod server;
mod storage;

pub use broker::{BridgeConfig, BrokerConfig};
pub use error::{ConfigError, ValidationError};
pub use server::{LogFormat, ServerConfig};
pub use storage::{StorageBackend, StorageConfig};

use serde::Deserialize;

/// Root configuration. Every section is defaulted, so an empty
/// environment is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub broker: BrokerConfig,
    pub bridge: BridgeConfig,
}

impl AppConfig {
    /// Read `.env` if present, then the prefixed environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a value cannot be parsed into its field.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(ConfigError::DotEnv(e.to_string()));
            }
        }

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("IDENTITY_BROKER")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.storage.validate()
    }
}
