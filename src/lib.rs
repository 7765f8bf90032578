//! Identity Broker - shared identity profiles for many concurrent clients
//!
//! A single broker task owns the profile store and the active-identity
//! pointer. Clients attach over channels or WebSockets, send queries and
//! commands, and receive snapshot broadcasts after every mutation. The
//! external bridge adds transparent reconnection for unstable hosts.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
