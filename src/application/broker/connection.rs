//! Client side of a broker connection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::foundation::ConnectionId;
use crate::ports::TransportError;

use super::messages::{BrokerMessage, ClientRequest};
use super::router::BrokerCommand;

/// The kind of client on the other end of a connection.
///
/// Roles only label connections for logging and status; every role may
/// send every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientRole {
    /// Identity picker shown from the toolbar.
    #[serde(alias = "popup")]
    Selector,
    /// Profile management page.
    Settings,
    /// Profile creation page.
    Creation,
    /// Bridge used by external pages.
    ExternalBridge,
}

impl ClientRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientRole::Selector => "selector",
            ClientRole::Settings => "settings",
            ClientRole::Creation => "creation",
            ClientRole::ExternalBridge => "external-bridge",
        }
    }
}

impl fmt::Display for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "selector" | "popup" => Ok(ClientRole::Selector),
            "settings" => Ok(ClientRole::Settings),
            "creation" => Ok(ClientRole::Creation),
            "external-bridge" => Ok(ClientRole::ExternalBridge),
            other => Err(format!("unknown client role '{}'", other)),
        }
    }
}

/// An attached client's handle to the broker.
///
/// Frames sent through one connection are processed in order, and messages
/// arrive on [`recv`](Self::recv) in the order the broker emitted them.
/// Dropping the connection detaches it.
pub struct ClientConnection {
    id: ConnectionId,
    role: ClientRole,
    outbound: mpsc::UnboundedSender<BrokerCommand>,
    inbound: mpsc::UnboundedReceiver<BrokerMessage>,
}

impl ClientConnection {
    pub(crate) fn new(
        id: ConnectionId,
        role: ClientRole,
        outbound: mpsc::UnboundedSender<BrokerCommand>,
        inbound: mpsc::UnboundedReceiver<BrokerMessage>,
    ) -> Self {
        Self {
            id,
            role,
            outbound,
            inbound,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn role(&self) -> ClientRole {
        self.role
    }

    /// Send a typed request.
    pub fn send(&self, request: &ClientRequest) -> Result<(), TransportError> {
        let frame = serde_json::to_value(request).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.send_raw(frame)
    }

    /// Send an arbitrary JSON frame. The broker decides whether it conforms.
    pub fn send_raw(&self, frame: Value) -> Result<(), TransportError> {
        self.outbound
            .send(BrokerCommand::Frame {
                connection_id: self.id,
                frame,
            })
            .map_err(|_| TransportError::BrokerUnavailable)
    }

    /// Next message from the broker.
    ///
    /// Returns `None` once the host has torn the connection down.
    pub async fn recv(&mut self) -> Option<BrokerMessage> {
        self.inbound.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<BrokerMessage> {
        self.inbound.try_recv().ok()
    }
}

impl fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("role", &self.role)
            .finish()
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        let _ = self.outbound.send(BrokerCommand::Detach {
            connection_id: self.id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_wire_names() {
        assert_eq!("selector".parse::<ClientRole>(), Ok(ClientRole::Selector));
        assert_eq!("popup".parse::<ClientRole>(), Ok(ClientRole::Selector));
        assert_eq!("external-bridge".parse::<ClientRole>(), Ok(ClientRole::ExternalBridge));
        assert!("admin".parse::<ClientRole>().is_err());
    }

    #[test]
    fn role_display_round_trips_through_from_str() {
        for role in [
            ClientRole::Selector,
            ClientRole::Settings,
            ClientRole::Creation,
            ClientRole::ExternalBridge,
        ] {
            assert_eq!(role.to_string().parse::<ClientRole>(), Ok(role));
        }
    }

    #[test]
    fn dropping_connection_sends_detach() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (_msg_tx, msg_rx) = mpsc::unbounded_channel();
        let id = ConnectionId::new();

        drop(ClientConnection::new(id, ClientRole::Settings, tx, msg_rx));

        match rx.try_recv() {
            Ok(BrokerCommand::Detach { connection_id }) => assert_eq!(connection_id, id),
            _ => panic!("expected detach"),
        }
    }

    #[test]
    fn send_fails_when_broker_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (_msg_tx, msg_rx) = mpsc::unbounded_channel();
        drop(rx);

        let connection = ClientConnection::new(ConnectionId::new(), ClientRole::Creation, tx, msg_rx);

        assert_eq!(
            connection.send(&ClientRequest::RequestIdentities),
            Err(TransportError::BrokerUnavailable)
        );
    }
}
