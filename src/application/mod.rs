//! Application layer - the profile store and the broker that serializes
//! access to it.

pub mod broker;
mod profile_store;

pub use broker::{Broker, BrokerHandle, BrokerMessage, ClientConnection, ClientRequest, ClientRole};
pub use profile_store::ProfileStore;
