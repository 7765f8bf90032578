//! In-process BrokerTransport over a [`BrokerHandle`].

use async_trait::async_trait;

use crate::application::broker::{BrokerHandle, ClientConnection, ClientRole};
use crate::ports::{BrokerTransport, TransportError};

/// Connects clients living in the same process as the broker.
#[derive(Clone)]
pub struct InProcessTransport {
    handle: BrokerHandle,
}

impl InProcessTransport {
    pub fn new(handle: BrokerHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl BrokerTransport for InProcessTransport {
    async fn connect(&self, role: ClientRole) -> Result<ClientConnection, TransportError> {
        self.handle.attach(role).await
    }
}
