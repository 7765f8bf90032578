//! WebSocket adapter exposing the broker over HTTP.
//!
//! ```text
//! client ──ws──▶ /connect/:role ──▶ ClientConnection ──▶ Broker task
//!        ◀─────────────────────────────── BrokerMessage ◀──┘
//! ```

pub mod handler;

pub use handler::{health, websocket_router, ws_handler, HealthResponse, WebSocketState};
