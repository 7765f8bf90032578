//! Integration tests for the external bridge against a live broker.
//!
//! The host tearing down the bridge's connection is routine. These tests
//! check that the bridge reconnects on its own, replays the active
//! identity to its handlers, and only gives up when the host keeps
//! refusing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use identity_broker::adapters::bridge::SupervisorState;
use identity_broker::adapters::{BridgeError, IdentityBridge, InMemoryProfileStorage, InProcessTransport};
use identity_broker::application::{
    Broker, BrokerHandle, BrokerMessage, ClientConnection, ClientRequest, ClientRole, ProfileStore,
};
use identity_broker::config::{BridgeConfig, BrokerConfig};
use identity_broker::domain::foundation::ProfileId;
use identity_broker::domain::profile::{ProfileDraft, ProfilePatch};
use identity_broker::ports::{BrokerTransport, TransportError};

// =============================================================================
// Test Infrastructure
// =============================================================================

const WAIT: Duration = Duration::from_secs(2);

async fn start_broker() -> BrokerHandle {
    let store = ProfileStore::load(Arc::new(InMemoryProfileStorage::new()))
        .await
        .unwrap();
    let (broker, handle) = Broker::new(
        store,
        BrokerConfig {
            activate_on_create: false,
            ..Default::default()
        },
    );
    broker.spawn();
    handle
}

async fn next(conn: &mut ClientConnection) -> BrokerMessage {
    tokio::time::timeout(WAIT, conn.recv())
        .await
        .expect("timed out waiting for broker message")
        .expect("connection closed")
}

/// Create a profile through a settings connection and return its id.
async fn create(settings: &mut ClientConnection, name: &str) -> ProfileId {
    settings
        .send(&ClientRequest::CreateProfile(ProfileDraft::with_idp(
            name,
            format!("https://{}.idp.example", name.to_lowercase()),
        )))
        .unwrap();
    match next(settings).await {
        BrokerMessage::AllIdentitiesResponse(list) => list
            .iter()
            .find(|p| p.display_name() == name)
            .map(|p| p.id())
            .expect("created profile missing from broadcast"),
        other => panic!("expected all-identities-response, got {:?}", other),
    }
}

async fn select(settings: &mut ClientConnection, id: ProfileId) {
    settings
        .send_raw(json!({"type": "set-active-identity", "data": {"id": id.to_string()}}))
        .unwrap();
    match next(settings).await {
        BrokerMessage::ActiveIdentityResponse(Some(profile)) => assert_eq!(profile.id(), id),
        other => panic!("expected active-identity-response, got {:?}", other),
    }
}

/// Records every active identity a bridge handler is called with.
fn recorder(bridge: &IdentityBridge) -> mpsc::UnboundedReceiver<Option<ProfileId>> {
    let (tx, rx) = mpsc::unbounded_channel();
    bridge
        .on_identity_changed(move |active| {
            let _ = tx.send(active.map(|p| p.id()));
        })
        .unwrap();
    rx
}

async fn next_call(calls: &mut mpsc::UnboundedReceiver<Option<ProfileId>>) -> Option<ProfileId> {
    tokio::time::timeout(WAIT, calls.recv())
        .await
        .expect("timed out waiting for identity handler")
        .expect("handler dropped")
}

async fn wait_for_connects(bridge: &IdentityBridge, connects: u64) {
    let mut status = bridge.watch_supervisor();
    tokio::time::timeout(
        WAIT,
        status.wait_for(|s| s.connects >= connects && s.state == SupervisorState::Connected),
    )
    .await
    .expect("timed out waiting for bridge to connect")
    .unwrap();
}

/// Transport that refuses while its gate is closed.
struct GatedTransport {
    inner: InProcessTransport,
    open: AtomicBool,
    refusals: AtomicU32,
}

impl GatedTransport {
    fn new(handle: BrokerHandle, open: bool) -> Self {
        Self {
            inner: InProcessTransport::new(handle),
            open: AtomicBool::new(open),
            refusals: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl BrokerTransport for GatedTransport {
    async fn connect(&self, role: ClientRole) -> Result<ClientConnection, TransportError> {
        if !self.open.load(Ordering::SeqCst) {
            self.refusals.fetch_add(1, Ordering::SeqCst);
            return Err(TransportError::Refused("gate closed".to_string()));
        }
        self.inner.connect(role).await
    }
}

/// Transport that refuses a fixed number of times, then connects.
struct FlakyTransport {
    inner: InProcessTransport,
    refusals_left: AtomicU32,
}

#[async_trait]
impl BrokerTransport for FlakyTransport {
    async fn connect(&self, role: ClientRole) -> Result<ClientConnection, TransportError> {
        let left = self.refusals_left.load(Ordering::SeqCst);
        if left > 0 {
            self.refusals_left.store(left - 1, Ordering::SeqCst);
            return Err(TransportError::BrokerUnavailable);
        }
        self.inner.connect(role).await
    }
}

// =============================================================================
// Reconnect Resync
// =============================================================================

#[tokio::test]
async fn handler_fires_again_after_host_disconnect() {
    let handle = start_broker().await;
    let mut settings = handle.attach(ClientRole::Settings).await.unwrap();
    let p1 = create(&mut settings, "P1").await;
    select(&mut settings, p1).await;

    let bridge = IdentityBridge::start(
        Arc::new(InProcessTransport::new(handle.clone())),
        &BridgeConfig::default(),
    );
    let mut calls = recorder(&bridge);
    assert_eq!(next_call(&mut calls).await, Some(p1));
    wait_for_connects(&bridge, 1).await;

    handle.disconnect_role(ClientRole::ExternalBridge).unwrap();

    assert_eq!(next_call(&mut calls).await, Some(p1));
    wait_for_connects(&bridge, 2).await;
    assert!(bridge.is_host_available());
    assert_eq!(bridge.active_identity().map(|p| p.id()), Some(p1));

    bridge.close().await;
}

#[tokio::test]
async fn repeated_disconnects_keep_resyncing() {
    let handle = start_broker().await;
    let mut settings = handle.attach(ClientRole::Settings).await.unwrap();
    let p1 = create(&mut settings, "P1").await;
    select(&mut settings, p1).await;

    let bridge = IdentityBridge::start(
        Arc::new(InProcessTransport::new(handle.clone())),
        &BridgeConfig::default(),
    );
    let mut calls = recorder(&bridge);
    assert_eq!(next_call(&mut calls).await, Some(p1));

    for round in 2..=5 {
        wait_for_connects(&bridge, round - 1).await;
        handle.disconnect_role(ClientRole::ExternalBridge).unwrap();
        assert_eq!(next_call(&mut calls).await, Some(p1));
    }
    wait_for_connects(&bridge, 5).await;
    assert_eq!(bridge.supervisor_state().failed_attempts, 0);

    bridge.close().await;
}

#[tokio::test]
async fn change_made_while_disconnected_is_seen_on_resync() {
    let handle = start_broker().await;
    let mut settings = handle.attach(ClientRole::Settings).await.unwrap();
    let p1 = create(&mut settings, "P1").await;
    let p2 = create(&mut settings, "P2").await;
    select(&mut settings, p1).await;

    let transport = Arc::new(GatedTransport::new(handle.clone(), true));
    let bridge = IdentityBridge::start(transport.clone(), &BridgeConfig {
        max_reconnect_attempts: 0,
    });
    let mut calls = recorder(&bridge);
    assert_eq!(next_call(&mut calls).await, Some(p1));
    wait_for_connects(&bridge, 1).await;

    transport.open.store(false, Ordering::SeqCst);
    handle.disconnect_role(ClientRole::ExternalBridge).unwrap();
    select(&mut settings, p2).await;
    transport.open.store(true, Ordering::SeqCst);

    assert_eq!(next_call(&mut calls).await, Some(p2));
    bridge.close().await;
}

// =============================================================================
// Live Updates
// =============================================================================

#[tokio::test]
async fn reselecting_same_profile_notifies_once() {
    let handle = start_broker().await;
    let mut settings = handle.attach(ClientRole::Settings).await.unwrap();
    let p1 = create(&mut settings, "P1").await;
    select(&mut settings, p1).await;

    let bridge = IdentityBridge::start(
        Arc::new(InProcessTransport::new(handle.clone())),
        &BridgeConfig::default(),
    );
    let mut calls = recorder(&bridge);
    assert_eq!(next_call(&mut calls).await, Some(p1));

    select(&mut settings, p1).await;

    assert_eq!(next_call(&mut calls).await, Some(p1));
    handle.status().await.unwrap();
    tokio::task::yield_now().await;
    assert!(calls.try_recv().is_err());

    bridge.close().await;
}

#[tokio::test]
async fn deleting_active_profile_notifies_none() {
    let handle = start_broker().await;
    let mut settings = handle.attach(ClientRole::Settings).await.unwrap();
    let p1 = create(&mut settings, "P1").await;
    select(&mut settings, p1).await;

    let bridge = IdentityBridge::start(
        Arc::new(InProcessTransport::new(handle.clone())),
        &BridgeConfig::default(),
    );
    let mut calls = recorder(&bridge);
    assert_eq!(next_call(&mut calls).await, Some(p1));

    settings
        .send_raw(json!({"type": "delete-profile", "data": {"id": p1.to_string()}}))
        .unwrap();

    assert_eq!(next_call(&mut calls).await, None);
    bridge.close().await;
}

#[tokio::test]
async fn update_profile_annotates_active_identity() {
    let handle = start_broker().await;
    let mut settings = handle.attach(ClientRole::Settings).await.unwrap();
    let p1 = create(&mut settings, "P1").await;
    select(&mut settings, p1).await;

    let bridge = IdentityBridge::start(
        Arc::new(InProcessTransport::new(handle.clone())),
        &BridgeConfig::default(),
    );
    let mut active = bridge.watch_active();
    tokio::time::timeout(WAIT, active.wait_for(|p| p.is_some()))
        .await
        .unwrap()
        .unwrap();

    bridge
        .update_profile(ProfilePatch::annotate("name", "Alice"))
        .unwrap();

    match next(&mut settings).await {
        BrokerMessage::AllIdentitiesResponse(list) => {
            assert_eq!(list[0].metadata().get("name"), Some(&json!("Alice")));
        }
        other => panic!("expected all-identities-response, got {:?}", other),
    }
    tokio::time::timeout(
        WAIT,
        active.wait_for(|p| {
            p.as_ref()
                .is_some_and(|p| p.metadata().get("name") == Some(&json!("Alice")))
        }),
    )
    .await
    .unwrap()
    .unwrap();

    bridge.close().await;
}

#[tokio::test]
async fn get_identities_survives_reconnect() {
    let handle = start_broker().await;
    let mut settings = handle.attach(ClientRole::Settings).await.unwrap();
    create(&mut settings, "P1").await;
    create(&mut settings, "P2").await;

    let bridge = IdentityBridge::start(
        Arc::new(InProcessTransport::new(handle.clone())),
        &BridgeConfig::default(),
    );
    assert_eq!(bridge.get_identities().await.unwrap().len(), 2);

    handle.disconnect_role(ClientRole::ExternalBridge).unwrap();
    let list = tokio::time::timeout(WAIT, bridge.get_identities())
        .await
        .unwrap()
        .unwrap();

    let names: Vec<_> = list.iter().map(|p| p.display_name().to_string()).collect();
    assert_eq!(names, vec!["P1", "P2"]);
    bridge.close().await;
}

#[tokio::test]
async fn concurrent_get_identities_all_resolve() {
    let handle = start_broker().await;
    let mut settings = handle.attach(ClientRole::Settings).await.unwrap();
    create(&mut settings, "P1").await;

    let bridge = IdentityBridge::start(
        Arc::new(InProcessTransport::new(handle.clone())),
        &BridgeConfig::default(),
    );
    let calls = (0..20).map(|_| bridge.get_identities());
    let results = tokio::time::timeout(WAIT, futures::future::join_all(calls))
        .await
        .unwrap();

    assert_eq!(results.len(), 20);
    assert!(results.iter().all(|r| r.as_ref().map(Vec::len) == Ok(1)));
    bridge.close().await;
}

// =============================================================================
// Refusing Host
// =============================================================================

#[tokio::test]
async fn transient_refusals_are_retried() {
    let handle = start_broker().await;
    let transport = Arc::new(FlakyTransport {
        inner: InProcessTransport::new(handle.clone()),
        refusals_left: AtomicU32::new(3),
    });
    let bridge = IdentityBridge::start(transport, &BridgeConfig {
        max_reconnect_attempts: 5,
    });

    wait_for_connects(&bridge, 1).await;
    assert!(bridge.get_identities().await.unwrap().is_empty());
    bridge.close().await;
}

#[tokio::test]
async fn persistent_refusal_marks_host_unavailable() {
    let handle = start_broker().await;
    let transport = Arc::new(GatedTransport::new(handle.clone(), true));
    let bridge = IdentityBridge::start(transport.clone(), &BridgeConfig {
        max_reconnect_attempts: 3,
    });
    wait_for_connects(&bridge, 1).await;
    assert!(bridge.is_host_available());

    transport.open.store(false, Ordering::SeqCst);
    handle.disconnect_role(ClientRole::ExternalBridge).unwrap();

    let mut status = bridge.watch_supervisor();
    tokio::time::timeout(WAIT, status.wait_for(|s| s.state == SupervisorState::Stopped))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(transport.refusals.load(Ordering::SeqCst), 3);
    assert!(!bridge.is_host_available());
    assert_eq!(
        bridge.get_identities().await,
        Err(BridgeError::HostUnavailable)
    );
    bridge.close().await;
}
