//! BrokerTransport port - how a client reaches the broker.
//!
//! The bridge only depends on this trait, so the same reconnect logic runs
//! against the in-process channel transport and anything else that can hand
//! out a [`ClientConnection`].

use async_trait::async_trait;

use crate::application::broker::{ClientConnection, ClientRole};

/// Errors raised while opening or using a broker connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The broker task is gone or never started.
    #[error("broker is unavailable")]
    BrokerUnavailable,

    /// The host declined to open a connection.
    #[error("connection refused: {0}")]
    Refused(String),

    #[error("failed to encode frame: {0}")]
    Encode(String),
}

/// Port for opening a connection to the broker under a given role.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    async fn connect(&self, role: ClientRole) -> Result<ClientConnection, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn BrokerTransport) {}

    #[test]
    fn refused_error_carries_reason() {
        let err = TransportError::Refused("host shutting down".to_string());
        assert_eq!(err.to_string(), "connection refused: host shutting down");
    }
}
