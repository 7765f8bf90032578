//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the broker to external systems:
//! - `storage` - profile persistence (YAML file, in-memory)
//! - `resolver` - WebID → IDP lookup
//! - `transport` - in-process broker connections
//! - `websocket` - axum endpoints for out-of-process clients
//! - `bridge` - reconnecting client for external pages

pub mod bridge;
pub mod resolver;
pub mod storage;
pub mod transport;
pub mod websocket;

pub use bridge::{BridgeError, IdentityBridge};
pub use resolver::StaticIdpResolver;
pub use storage::{FileProfileStorage, InMemoryProfileStorage};
pub use transport::InProcessTransport;
pub use websocket::{websocket_router, WebSocketState};
