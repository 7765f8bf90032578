//! Listener and logging settings

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use serde::Deserialize;

use super::error::ValidationError;

/// Where the WebSocket endpoint listens and how the daemon logs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,

    /// `EnvFilter` directive, used when `RUST_LOG` is unset
    pub log_level: String,

    /// `pretty` or `json`
    pub log_format: String,
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("pretty") {
            Ok(LogFormat::Pretty)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else {
            Err(ValidationError::UnknownLogFormat(s.to_string()))
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn log_format(&self) -> Result<LogFormat, ValidationError> {
        self.log_format.parse()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        self.log_format().map(|_| ())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 7878,
            log_level: "info,identity_broker=debug".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listens_on_loopback_by_default() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:7878");
        assert_eq!(config.log_format(), Ok(LogFormat::Pretty));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn log_format_ignores_case() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
    }

    #[test]
    fn port_zero_is_rejected() {
        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidPort));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let config = ServerConfig {
            log_format: "xml".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::UnknownLogFormat("xml".to_string()))
        );
    }
}
