//! IdentityBridge - the client used by external pages.
//!
//! Wraps one `external-bridge` connection. A background worker owns the
//! connection and the subscriber list; the public handle only talks to it
//! through a command channel. When the host drops the connection the
//! worker reconnects immediately, asks for the active identity again and
//! re-notifies every handler, so consumers never see the disconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::application::broker::{
    BrokerMessage, ClientConnection, ClientRequest, ClientRole, UpdateProfileRequest,
};
use crate::config::BridgeConfig;
use crate::domain::foundation::SubscriptionId;
use crate::domain::profile::{Profile, ProfilePatch};
use crate::ports::{BrokerTransport, TransportError};

use super::subscriptions::{IdentityHandler, SubscriptionRegistry};
use super::supervisor::{ReconnectPlan, ReconnectSupervisor, SupervisorSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The supervisor gave up reconnecting.
    #[error("identity host is unavailable")]
    HostUnavailable,

    #[error("bridge is closed")]
    Closed,

    #[error("no active identity to update")]
    NoActiveIdentity,
}

type IdentitiesReply = oneshot::Sender<Result<Vec<Profile>, BridgeError>>;

enum BridgeCommand {
    GetIdentities(IdentitiesReply),
    SetHandler(IdentityHandler),
    Subscribe(SubscriptionId, IdentityHandler),
    Unsubscribe(SubscriptionId),
    UpdateProfile(UpdateProfileRequest),
    Close,
}

enum SessionEnd {
    Disconnected,
    Closed,
}

struct Shared {
    host_available: AtomicBool,
    closed: AtomicBool,
}

/// Handle to a running bridge.
pub struct IdentityBridge {
    commands: mpsc::UnboundedSender<BridgeCommand>,
    shared: Arc<Shared>,
    active: watch::Receiver<Option<Profile>>,
    supervisor: watch::Receiver<SupervisorSnapshot>,
    worker: JoinHandle<()>,
}

impl IdentityBridge {
    /// Start the bridge. Connecting happens in the background.
    pub fn start(transport: Arc<dyn BrokerTransport>, config: &BridgeConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            host_available: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });
        let supervisor = ReconnectSupervisor::new(config.reconnect_limit());
        let (active_tx, active_rx) = watch::channel(None);
        let (status_tx, status_rx) = watch::channel(supervisor.snapshot());

        let worker = BridgeWorker {
            transport,
            supervisor,
            subscriptions: SubscriptionRegistry::new(),
            pending: Vec::new(),
            commands: commands_rx,
            shared: shared.clone(),
            active: active_tx,
            status: status_tx,
        };

        Self {
            commands: commands_tx,
            shared,
            active: active_rx,
            supervisor: status_rx,
            worker: tokio::spawn(worker.run()),
        }
    }

    /// Fetch the full identity list.
    ///
    /// Waits across reconnects; fails only if the bridge gives up or closes.
    pub async fn get_identities(&self) -> Result<Vec<Profile>, BridgeError> {
        let (reply, response) = oneshot::channel();
        self.send(BridgeCommand::GetIdentities(reply))?;
        response.await.map_err(|_| self.gone())?
    }

    /// Install the handler for active-identity changes, replacing any
    /// previous one.
    pub fn on_identity_changed<F>(&self, handler: F) -> Result<(), BridgeError>
    where
        F: Fn(Option<&Profile>) + Send + Sync + 'static,
    {
        self.send(BridgeCommand::SetHandler(Arc::new(handler)))
    }

    /// Add a handler alongside the primary one.
    pub fn subscribe<F>(&self, handler: F) -> Result<SubscriptionId, BridgeError>
    where
        F: Fn(Option<&Profile>) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.send(BridgeCommand::Subscribe(id, Arc::new(handler)))?;
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), BridgeError> {
        self.send(BridgeCommand::Unsubscribe(id))
    }

    /// Apply `patch` to the active profile without waiting for the result.
    pub fn update_profile(&self, patch: ProfilePatch) -> Result<(), BridgeError> {
        let id = self
            .active
            .borrow()
            .as_ref()
            .map(Profile::id)
            .ok_or(BridgeError::NoActiveIdentity)?;
        self.send(BridgeCommand::UpdateProfile(UpdateProfileRequest { id, patch }))
    }

    pub fn is_host_available(&self) -> bool {
        self.shared.host_available.load(Ordering::SeqCst)
    }

    /// Last active identity reported by the broker.
    pub fn active_identity(&self) -> Option<Profile> {
        self.active.borrow().clone()
    }

    pub fn watch_active(&self) -> watch::Receiver<Option<Profile>> {
        self.active.clone()
    }

    pub fn supervisor_state(&self) -> SupervisorSnapshot {
        *self.supervisor.borrow()
    }

    pub fn watch_supervisor(&self) -> watch::Receiver<SupervisorSnapshot> {
        self.supervisor.clone()
    }

    /// Stop the worker and drop the connection.
    pub async fn close(self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        let _ = self.commands.send(BridgeCommand::Close);
        if let Err(e) = self.worker.await {
            tracing::error!(error = %e, "Bridge worker failed");
        }
    }

    fn send(&self, command: BridgeCommand) -> Result<(), BridgeError> {
        self.commands.send(command).map_err(|_| self.gone())
    }

    fn gone(&self) -> BridgeError {
        if self.shared.closed.load(Ordering::SeqCst) {
            BridgeError::Closed
        } else {
            BridgeError::HostUnavailable
        }
    }
}

struct BridgeWorker {
    transport: Arc<dyn BrokerTransport>,
    supervisor: ReconnectSupervisor,
    subscriptions: SubscriptionRegistry,
    pending: Vec<IdentitiesReply>,
    commands: mpsc::UnboundedReceiver<BridgeCommand>,
    shared: Arc<Shared>,
    active: watch::Sender<Option<Profile>>,
    status: watch::Sender<SupervisorSnapshot>,
}

impl BridgeWorker {
    async fn run(mut self) {
        loop {
            let Some(mut connection) = self.establish().await else {
                break;
            };

            match self.serve(&mut connection).await {
                SessionEnd::Closed => break,
                SessionEnd::Disconnected => {
                    self.shared.host_available.store(false, Ordering::SeqCst);
                    self.supervisor.mark_disconnected();
                    self.publish_status();
                    tracing::info!(connection_id = %connection.id(), "Bridge transport disconnected, reconnecting");
                }
            }
        }

        self.finish();
    }

    /// Connect, retrying immediately until the supervisor gives up.
    ///
    /// Returns `None` when the bridge should stop.
    async fn establish(&mut self) -> Option<ClientConnection> {
        loop {
            let attempt = match self.supervisor.next_attempt() {
                ReconnectPlan::Attempt { attempt } => attempt,
                ReconnectPlan::GiveUp { failed_attempts } => {
                    tracing::warn!(failed_attempts, "Giving up on identity host");
                    self.publish_status();
                    return None;
                }
            };
            self.publish_status();

            match self.transport.connect(ClientRole::ExternalBridge).await {
                Ok(connection) => {
                    self.supervisor.mark_connected();
                    self.shared.host_available.store(true, Ordering::SeqCst);
                    self.publish_status();
                    tracing::info!(connection_id = %connection.id(), attempt, "Bridge connected");
                    return Some(connection);
                }
                Err(e) => {
                    self.supervisor.mark_failed();
                    tracing::warn!(attempt, error = %e, "Bridge connect attempt failed");
                }
            }

            if !self.drain_while_offline() {
                self.supervisor.stop();
                self.publish_status();
                return None;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Handle queued commands between failed attempts. Returns `false` on close.
    fn drain_while_offline(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(BridgeCommand::Close) | Err(mpsc::error::TryRecvError::Disconnected) => return false,
                Ok(command) => {
                    let _ = self.apply(command, None);
                }
                Err(mpsc::error::TryRecvError::Empty) => return true,
            }
        }
    }

    async fn serve(&mut self, connection: &mut ClientConnection) -> SessionEnd {
        if self.resync(connection).is_err() {
            return SessionEnd::Disconnected;
        }

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    None | Some(BridgeCommand::Close) => return SessionEnd::Closed,
                    Some(command) => {
                        if self.apply(command, Some(&*connection)).is_err() {
                            return SessionEnd::Disconnected;
                        }
                    }
                },
                message = connection.recv() => match message {
                    Some(message) => self.on_message(message),
                    None => return SessionEnd::Disconnected,
                },
            }
        }
    }

    /// Re-request everything a fresh connection needs.
    fn resync(&self, connection: &ClientConnection) -> Result<(), TransportError> {
        connection.send(&ClientRequest::RequestActiveIdentity)?;
        if !self.pending.is_empty() {
            connection.send(&ClientRequest::RequestIdentities)?;
        }
        Ok(())
    }

    fn apply(&mut self, command: BridgeCommand, connection: Option<&ClientConnection>) -> Result<(), TransportError> {
        match command {
            BridgeCommand::GetIdentities(reply) => {
                let first = self.pending.is_empty();
                self.pending.push(reply);
                if let (true, Some(connection)) = (first, connection) {
                    connection.send(&ClientRequest::RequestIdentities)?;
                }
            }
            BridgeCommand::SetHandler(handler) => {
                if self.subscriptions.replace_primary(handler) {
                    tracing::debug!("Replaced identity change handler");
                }
            }
            BridgeCommand::Subscribe(id, handler) => self.subscriptions.subscribe(id, handler),
            BridgeCommand::Unsubscribe(id) => {
                self.subscriptions.unsubscribe(&id);
            }
            BridgeCommand::UpdateProfile(request) => match connection {
                Some(connection) => connection.send(&ClientRequest::UpdateProfile(request))?,
                None => tracing::debug!(profile_id = %request.id, "Dropping profile update while offline"),
            },
            BridgeCommand::Close => {}
        }
        Ok(())
    }

    fn on_message(&mut self, message: BrokerMessage) {
        match message {
            BrokerMessage::AllIdentitiesResponse(identities) => {
                for reply in self.pending.drain(..) {
                    let _ = reply.send(Ok(identities.clone()));
                }
            }
            BrokerMessage::ActiveIdentityResponse(active) => {
                self.active.send_replace(active.clone());
                self.subscriptions.notify(active.as_ref());
            }
            BrokerMessage::ActiveIdentityResponseError(failure) => {
                tracing::warn!(display_name = %failure.display_name, "Active identity did not resolve");
            }
            BrokerMessage::CommandError(failure) => {
                tracing::warn!(
                    command = %failure.command,
                    code = %failure.code,
                    "Bridge command rejected: {}",
                    failure.message
                );
            }
        }
    }

    fn publish_status(&self) {
        self.status.send_replace(self.supervisor.snapshot());
    }

    fn finish(mut self) {
        self.shared.host_available.store(false, Ordering::SeqCst);
        self.supervisor.stop();
        self.publish_status();

        let error = if self.shared.closed.load(Ordering::SeqCst) {
            BridgeError::Closed
        } else {
            BridgeError::HostUnavailable
        };
        while let Ok(command) = self.commands.try_recv() {
            if let BridgeCommand::GetIdentities(reply) = command {
                self.pending.push(reply);
            }
        }
        for reply in self.pending.drain(..) {
            let _ = reply.send(Err(error.clone()));
        }
        tracing::info!("Bridge stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::bridge::SupervisorState;
    use crate::adapters::storage::InMemoryProfileStorage;
    use crate::adapters::transport::InProcessTransport;
    use crate::application::{Broker, BrokerHandle, ProfileStore};
    use crate::config::BrokerConfig;
    use async_trait::async_trait;

    struct RefusingTransport;

    #[async_trait]
    impl BrokerTransport for RefusingTransport {
        async fn connect(&self, _role: ClientRole) -> Result<ClientConnection, TransportError> {
            Err(TransportError::Refused("host asleep".to_string()))
        }
    }

    async fn broker() -> BrokerHandle {
        let store = ProfileStore::load(Arc::new(InMemoryProfileStorage::new()))
            .await
            .unwrap();
        let (broker, handle) = Broker::new(store, BrokerConfig::default());
        broker.spawn();
        handle
    }

    #[tokio::test]
    async fn get_identities_resolves_with_list() {
        let handle = broker().await;
        let bridge = IdentityBridge::start(
            Arc::new(InProcessTransport::new(handle)),
            &BridgeConfig::default(),
        );

        assert_eq!(bridge.get_identities().await, Ok(vec![]));
        assert!(bridge.is_host_available());
    }

    #[tokio::test]
    async fn update_without_active_identity_is_rejected() {
        let handle = broker().await;
        let bridge = IdentityBridge::start(
            Arc::new(InProcessTransport::new(handle)),
            &BridgeConfig::default(),
        );

        assert_eq!(
            bridge.update_profile(ProfilePatch::annotate("name", "Alice")),
            Err(BridgeError::NoActiveIdentity)
        );
    }

    #[tokio::test]
    async fn refusing_host_stops_after_limit() {
        let bridge = IdentityBridge::start(
            Arc::new(RefusingTransport),
            &BridgeConfig {
                max_reconnect_attempts: 3,
            },
        );

        assert_eq!(bridge.get_identities().await, Err(BridgeError::HostUnavailable));
        assert!(!bridge.is_host_available());

        let snapshot = bridge.supervisor_state();
        assert_eq!(snapshot.state, SupervisorState::Stopped);
        assert_eq!(snapshot.failed_attempts, 3);
    }

    #[tokio::test]
    async fn close_fails_pending_and_later_calls() {
        let bridge = IdentityBridge::start(
            Arc::new(RefusingTransport),
            &BridgeConfig {
                max_reconnect_attempts: 0,
            },
        );
        let commands = bridge.commands.clone();
        let shared = bridge.shared.clone();

        bridge.close().await;

        assert!(shared.closed.load(Ordering::SeqCst));
        assert!(commands.send(BridgeCommand::Close).is_err());
    }
}
