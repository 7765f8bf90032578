//! Broker - the single task that owns the profile store.
//!
//! All clients talk to the broker through one command channel, so every
//! mutation is applied in arrival order and no locks are needed.
//!
//! # Routing
//!
//! | Request                  | Reply to             | Broadcast                        |
//! |--------------------------|----------------------|----------------------------------|
//! | `request-identities`     | originator           | -                                |
//! | `request-active-identity`| originator           | -                                |
//! | `create-profile`         | -                    | identities (+ active if selected)|
//! | `update-profile`         | -                    | identities (+ active if it is)   |
//! | `delete-profile`         | -                    | identities (+ active if cleared) |
//! | `set-active-identity`    | resolution error     | active                           |
//!
//! Rejected commands produce a `command-error` for the originator only.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::application::ProfileStore;
use crate::config::BrokerConfig;
use crate::domain::foundation::{ConnectionId, DomainError, ErrorCode, ProfileId};
use crate::domain::profile::{Profile, ProfileDraft, ProfileError};
use crate::ports::{IdpResolver, ResolutionError, TransportError};

use super::connection::{ClientConnection, ClientRole};
use super::messages::{
    BrokerMessage, ClientRequest, CommandFailure, FrameError, ResolutionFailure, UpdateProfileRequest,
};
use super::registry::{ConnectionRegistry, ConnectionSummary};

/// Commands accepted by the broker task.
pub(crate) enum BrokerCommand {
    Attach {
        role: ClientRole,
        reply: oneshot::Sender<(ConnectionId, mpsc::UnboundedReceiver<BrokerMessage>)>,
    },
    Frame {
        connection_id: ConnectionId,
        frame: Value,
    },
    Detach {
        connection_id: ConnectionId,
    },
    DisconnectRole {
        role: ClientRole,
    },
    Status {
        reply: oneshot::Sender<BrokerStatus>,
    },
    Shutdown,
}

/// Point-in-time view of the broker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerStatus {
    pub version: u64,
    pub profiles: usize,
    pub active_identity_id: Option<ProfileId>,
    pub connections: Vec<ConnectionSummary>,
}

/// Cloneable handle for talking to a running [`Broker`].
#[derive(Clone)]
pub struct BrokerHandle {
    commands: mpsc::UnboundedSender<BrokerCommand>,
}

impl BrokerHandle {
    /// Open a new client connection under `role`.
    pub async fn attach(&self, role: ClientRole) -> Result<ClientConnection, TransportError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(BrokerCommand::Attach { role, reply })
            .map_err(|_| TransportError::BrokerUnavailable)?;
        let (id, inbound) = response.await.map_err(|_| TransportError::BrokerUnavailable)?;
        Ok(ClientConnection::new(id, role, self.commands.clone(), inbound))
    }

    /// Tear down every connection with `role` from the host side.
    ///
    /// Affected clients see their receive stream end.
    pub fn disconnect_role(&self, role: ClientRole) -> Result<(), TransportError> {
        self.commands
            .send(BrokerCommand::DisconnectRole { role })
            .map_err(|_| TransportError::BrokerUnavailable)
    }

    pub async fn status(&self) -> Result<BrokerStatus, TransportError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(BrokerCommand::Status { reply })
            .map_err(|_| TransportError::BrokerUnavailable)?;
        response.await.map_err(|_| TransportError::BrokerUnavailable)
    }

    /// Stop the broker. Open connections are closed.
    pub fn shutdown(&self) {
        let _ = self.commands.send(BrokerCommand::Shutdown);
    }
}

/// Owns the store and the connection registry.
pub struct Broker {
    store: ProfileStore,
    registry: ConnectionRegistry,
    resolver: Option<Arc<dyn IdpResolver>>,
    config: BrokerConfig,
    commands: mpsc::UnboundedReceiver<BrokerCommand>,
}

impl Broker {
    pub fn new(store: ProfileStore, config: BrokerConfig) -> (Self, BrokerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let broker = Self {
            store,
            registry: ConnectionRegistry::new(),
            resolver: None,
            config,
            commands: rx,
        };
        (broker, BrokerHandle { commands: tx })
    }

    /// Check WebID profiles against `resolver` when they are selected.
    pub fn with_resolver(mut self, resolver: Arc<dyn IdpResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process commands until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!(
            profiles = self.store.list().len(),
            activate_on_create = self.config.activate_on_create,
            "Broker started"
        );

        while let Some(command) = self.commands.recv().await {
            match command {
                BrokerCommand::Attach { role, reply } => {
                    let (id, inbound) = self.registry.attach(role);
                    if reply.send((id, inbound)).is_err() {
                        self.registry.detach(&id);
                        continue;
                    }
                    tracing::info!(connection_id = %id, role = %role, "Client attached");
                }
                BrokerCommand::Frame { connection_id, frame } => {
                    self.handle_frame(connection_id, frame).await;
                }
                BrokerCommand::Detach { connection_id } => {
                    if let Some(role) = self.registry.detach(&connection_id) {
                        tracing::info!(connection_id = %connection_id, role = %role, "Client detached");
                    }
                }
                BrokerCommand::DisconnectRole { role } => {
                    let removed = self.registry.detach_role(role);
                    tracing::info!(role = %role, count = removed.len(), "Host disconnected clients");
                }
                BrokerCommand::Status { reply } => {
                    let _ = reply.send(self.status());
                }
                BrokerCommand::Shutdown => break,
            }
        }

        tracing::info!(version = self.store.version(), "Broker stopped");
    }

    fn status(&self) -> BrokerStatus {
        BrokerStatus {
            version: self.store.version(),
            profiles: self.store.list().len(),
            active_identity_id: self.store.active().current(),
            connections: self.registry.summaries(),
        }
    }

    async fn handle_frame(&mut self, origin: ConnectionId, frame: Value) {
        if !self.registry.contains(&origin) {
            tracing::debug!(connection_id = %origin, "Dropping frame from detached client");
            return;
        }

        let display_name = frame
            .pointer("/data/displayName")
            .and_then(Value::as_str)
            .map(str::to_string);

        let request = match ClientRequest::parse(frame) {
            Ok(request) => request,
            Err(FrameError::InvalidPayload { kind, reason }) => {
                tracing::warn!(connection_id = %origin, kind = %kind, reason = %reason, "Rejected malformed frame");
                let error = DomainError::new(ErrorCode::InvalidPayload, reason);
                self.reply(origin, BrokerMessage::CommandError(CommandFailure::new(kind, display_name, error)));
                return;
            }
            Err(e) => {
                tracing::warn!(connection_id = %origin, "{}", e);
                return;
            }
        };

        tracing::debug!(connection_id = %origin, kind = request.kind(), "Handling request");
        self.dispatch(origin, request).await;
    }

    async fn dispatch(&mut self, origin: ConnectionId, request: ClientRequest) {
        match request {
            ClientRequest::RequestIdentities => {
                let message = self.identities_message();
                self.reply(origin, message);
            }
            ClientRequest::RequestActiveIdentity => {
                let message = self.active_message();
                self.reply(origin, message);
            }
            ClientRequest::CreateProfile(draft) => self.create_profile(origin, draft).await,
            ClientRequest::UpdateProfile(request) => self.update_profile(origin, request).await,
            ClientRequest::DeleteProfile(target) => self.delete_profile(origin, target.id).await,
            ClientRequest::SetActiveIdentity(selection) => match selection.id {
                Some(id) => self.select_identity(origin, id).await,
                None => self.clear_identity(origin).await,
            },
        }
    }

    async fn create_profile(&mut self, origin: ConnectionId, draft: ProfileDraft) {
        let display_name = draft.display_name.clone();
        let profile = match self.store.create(draft).await {
            Ok(profile) => profile,
            Err(e) => return self.reject(origin, "create-profile", Some(display_name), e),
        };
        tracing::info!(
            profile_id = %profile.id(),
            version = self.store.version(),
            "Profile created"
        );

        let mut selected = false;
        if self.config.activate_on_create {
            match self.store.select(profile.id()).await {
                Ok(changed) => selected = changed,
                Err(e) => {
                    tracing::error!(profile_id = %profile.id(), error = %e, "Failed to activate new profile")
                }
            }
        }

        self.broadcast_identities();
        if selected {
            self.broadcast_active();
            self.check_resolution(origin, &profile).await;
        }
    }

    async fn update_profile(&mut self, origin: ConnectionId, request: UpdateProfileRequest) {
        let before = self.store.version();
        let is_active = self.store.active().current() == Some(request.id);

        match self.store.update(request.id, &request.patch).await {
            Ok(profile) => {
                if self.store.version() == before {
                    tracing::debug!(profile_id = %profile.id(), "Update changed nothing");
                    return;
                }
                tracing::info!(profile_id = %profile.id(), version = self.store.version(), "Profile updated");
                self.broadcast_identities();
                if is_active {
                    self.broadcast_active();
                }
            }
            Err(e) => {
                let display_name = request
                    .patch
                    .display_name
                    .clone()
                    .or_else(|| self.display_name_of(&request.id));
                self.reject(origin, "update-profile", display_name, e);
            }
        }
    }

    async fn delete_profile(&mut self, origin: ConnectionId, id: ProfileId) {
        let display_name = self.display_name_of(&id);
        let was_active = self.store.active().current() == Some(id);

        match self.store.delete(id).await {
            Ok(()) => {
                tracing::info!(profile_id = %id, version = self.store.version(), "Profile deleted");
                self.broadcast_identities();
                if was_active {
                    self.broadcast_active();
                }
            }
            Err(e) => self.reject(origin, "delete-profile", display_name, e),
        }
    }

    async fn select_identity(&mut self, origin: ConnectionId, id: ProfileId) {
        match self.store.select(id).await {
            Ok(changed) => {
                if changed {
                    tracing::info!(profile_id = %id, version = self.store.version(), "Active identity changed");
                }
                self.broadcast_active();

                let selected = self.store.active_profile().cloned();
                if let Some(profile) = selected {
                    self.check_resolution(origin, &profile).await;
                }
            }
            Err(e) => self.reject(origin, "set-active-identity", None, e),
        }
    }

    async fn clear_identity(&mut self, origin: ConnectionId) {
        match self.store.deselect().await {
            Ok(changed) => {
                if changed {
                    tracing::info!(version = self.store.version(), "Active identity cleared");
                }
                self.broadcast_active();
            }
            Err(e) => self.reject(origin, "set-active-identity", None, e),
        }
    }

    /// Report a WebID that does not resolve to an identity provider.
    ///
    /// The pointer stays where it is; only the originator hears about it.
    /// The lookup runs inside the broker task, so it is bounded by
    /// `resolve_timeout_ms`.
    async fn check_resolution(&mut self, origin: ConnectionId, profile: &Profile) {
        let (Some(resolver), Some(web_id)) = (self.resolver.clone(), profile.web_id()) else {
            return;
        };

        let limit = Duration::from_millis(self.config.resolve_timeout_ms);
        let failure = match tokio::time::timeout(limit, resolver.resolve(web_id)).await {
            Ok(Ok(issuers)) if !issuers.is_empty() => {
                tracing::debug!(profile_id = %profile.id(), issuer = %issuers[0], "WebID resolved");
                return;
            }
            Ok(Ok(_)) => ResolutionError::new(web_id, "no identity provider advertised"),
            Ok(Err(e)) => e,
            Err(_) => ResolutionError::new(web_id, format!("lookup timed out after {:?}", limit)),
        };

        tracing::warn!(profile_id = %profile.id(), error = %failure, "WebID resolution failed");
        self.reply(
            origin,
            BrokerMessage::ActiveIdentityResponseError(ResolutionFailure {
                display_name: profile.display_name().to_string(),
            }),
        );
    }

    fn reject(&mut self, origin: ConnectionId, command: &str, display_name: Option<String>, error: ProfileError) {
        match &error {
            ProfileError::Storage(_) => {
                tracing::error!(connection_id = %origin, command, error = %error, "Command failed")
            }
            _ => tracing::debug!(connection_id = %origin, command, error = %error, "Command rejected"),
        }
        let failure = CommandFailure::new(command, display_name, error.into());
        self.reply(origin, BrokerMessage::CommandError(failure));
    }

    fn display_name_of(&self, id: &ProfileId) -> Option<String> {
        self.store.get(id).ok().map(|p| p.display_name().to_string())
    }

    fn identities_message(&self) -> BrokerMessage {
        BrokerMessage::AllIdentitiesResponse(self.store.list().to_vec())
    }

    fn active_message(&self) -> BrokerMessage {
        BrokerMessage::ActiveIdentityResponse(self.store.active_profile().cloned())
    }

    fn reply(&mut self, origin: ConnectionId, message: BrokerMessage) {
        if !self.registry.send_to(&origin, message) {
            tracing::debug!(connection_id = %origin, "Reply target is gone");
        }
    }

    fn broadcast_identities(&mut self) {
        let message = self.identities_message();
        self.registry.broadcast(&message);
    }

    fn broadcast_active(&mut self) {
        let message = self.active_message();
        self.registry.broadcast(&message);
    }
}
