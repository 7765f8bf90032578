//! External bridge: a self-healing client connection for third-party pages.
//!
//! - [`client`] - `IdentityBridge`, the public handle and its worker
//! - [`supervisor`] - reconnect state machine
//! - [`subscriptions`] - active-identity handlers

pub mod client;
pub mod subscriptions;
pub mod supervisor;

pub use client::{BridgeError, IdentityBridge};
pub use subscriptions::{IdentityHandler, SubscriptionRegistry};
pub use supervisor::{ReconnectPlan, ReconnectSupervisor, SupervisorSnapshot, SupervisorState};
