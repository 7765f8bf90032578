//! Connection registry for broker message routing.
//!
//! Owned by the broker task, so it needs no locking. Each entry holds the
//! sending half of the connection's message channel; a closed channel means
//! the client went away and the entry is pruned on the next send.
//!
//! ```text
//! Registry
//! ├── conn-a (selector)
//! ├── conn-b (settings)
//! └── conn-c (external-bridge)
//! ```

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::domain::foundation::{ConnectionId, Timestamp};

use super::connection::ClientRole;
use super::messages::BrokerMessage;

struct ConnectionEntry {
    role: ClientRole,
    sender: mpsc::UnboundedSender<BrokerMessage>,
    attached_at: Timestamp,
}

impl ConnectionEntry {
    fn is_live(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Monitoring view of one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub id: String,
    pub role: ClientRole,
    pub attached_at: Timestamp,
}

/// Live client connections keyed by id.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and return its id and message receiver.
    pub fn attach(&mut self, role: ClientRole) -> (ConnectionId, mpsc::UnboundedReceiver<BrokerMessage>) {
        let id = ConnectionId::new();
        let (sender, receiver) = mpsc::unbounded_channel();
        self.connections.insert(
            id,
            ConnectionEntry {
                role,
                sender,
                attached_at: Timestamp::now(),
            },
        );
        (id, receiver)
    }

    /// Remove a connection. Returns its role if it was registered.
    pub fn detach(&mut self, id: &ConnectionId) -> Option<ClientRole> {
        self.connections.remove(id).map(|entry| entry.role)
    }

    /// Detach every connection with `role`, returning the removed ids.
    pub fn detach_role(&mut self, role: ClientRole) -> Vec<ConnectionId> {
        let ids: Vec<_> = self
            .connections
            .iter()
            .filter(|(_, entry)| entry.role == role)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.connections.remove(id);
        }
        ids
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn role_of(&self, id: &ConnectionId) -> Option<ClientRole> {
        self.connections.get(id).map(|entry| entry.role)
    }

    /// Deliver to one connection. Returns `false` if it is gone.
    pub fn send_to(&mut self, id: &ConnectionId, message: BrokerMessage) -> bool {
        let Some(entry) = self.connections.get(id) else {
            return false;
        };
        if entry.sender.send(message).is_ok() {
            return true;
        }
        self.connections.remove(id);
        false
    }

    /// Deliver to every live connection. Returns how many received it.
    pub fn broadcast(&mut self, message: &BrokerMessage) -> usize {
        self.connections
            .retain(|_, entry| entry.is_live() && entry.sender.send(message.clone()).is_ok());
        self.connections.len()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Summaries of all connections, oldest first.
    pub fn summaries(&self) -> Vec<ConnectionSummary> {
        let mut summaries: Vec<_> = self
            .connections
            .iter()
            .map(|(id, entry)| ConnectionSummary {
                id: id.to_string(),
                role: entry.role,
                attached_at: entry.attached_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.attached_at.cmp(&b.attached_at));
        summaries
    }
}
