//! WebSocket upgrade handler exposing the broker to out-of-process clients.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Parse the client role from the path
//! 2. Upgrade to WebSocket
//! 3. Attach to the broker
//! 4. Forward frames both ways until either side closes
//! 5. Detach (by dropping the broker connection)

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::application::broker::{BrokerHandle, BrokerMessage, ClientConnection, ClientRole};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub broker: BrokerHandle,
}

impl WebSocketState {
    pub fn new(broker: BrokerHandle) -> Self {
        Self { broker }
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /connect/:role`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(role): Path<String>,
    State(state): State<WebSocketState>,
) -> Response {
    let role: ClientRole = match role.parse() {
        Ok(role) => role,
        Err(reason) => return (StatusCode::BAD_REQUEST, reason).into_response(),
    };

    let connection = match state.broker.attach(role).await {
        Ok(connection) => connection,
        Err(e) => return (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, connection))
}

/// Pump frames between the socket and the broker until either side ends.
async fn handle_socket(socket: WebSocket, mut connection: ClientConnection) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = connection.id();

    loop {
        tokio::select! {
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let Some(frame) = decode_frame(&text) else {
                        tracing::warn!(connection_id = %connection_id, "Dropping non-JSON frame");
                        continue;
                    };
                    if connection.send_raw(frame).is_err() {
                        tracing::debug!(connection_id = %connection_id, "Broker gone, closing socket");
                        break;
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    tracing::warn!(connection_id = %connection_id, "Received unsupported binary message");
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // Protocol-level keepalive, answered by axum
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(connection_id = %connection_id, "Client closed socket");
                    break;
                }
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %connection_id, "Receive error: {}", e);
                    break;
                }
            },
            outbound = connection.recv() => match outbound {
                Some(message) => {
                    if let Err(e) = send_message(&mut sender, &message).await {
                        tracing::debug!(connection_id = %connection_id, "Send error, closing connection: {}", e);
                        break;
                    }
                }
                None => {
                    tracing::debug!(connection_id = %connection_id, "Broker closed connection");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
}

fn decode_frame(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    message: &BrokerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: u64,
    pub profiles: usize,
    pub connections: usize,
}

/// Route: `GET /health`
pub async fn health(State(state): State<WebSocketState>) -> (StatusCode, Json<HealthResponse>) {
    match state.broker.status().await {
        Ok(status) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                version: status.version,
                profiles: status.profiles,
                connections: status.connections.len(),
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable",
                version: 0,
                profiles: 0,
                connections: 0,
            }),
        ),
    }
}

/// Create axum router for the broker endpoints.
pub fn websocket_router(state: WebSocketState) -> Router {
    Router::new()
        .route("/connect/:role", get(ws_handler))
        .route("/health", get(health))
        .with_state(state)
}
