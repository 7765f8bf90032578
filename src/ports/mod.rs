//! Ports - interfaces between the broker and the outside world.
//!
//! - `ProfileStorage` - durable persistence of profiles and the active pointer
//! - `IdpResolver` - WebID to identity-provider discovery
//! - `BrokerTransport` - opening client connections to the broker

mod broker_transport;
mod idp_resolver;
mod profile_storage;

pub use broker_transport::{BrokerTransport, TransportError};
pub use idp_resolver::{IdpResolver, ResolutionError};
pub use profile_storage::{PersistedState, ProfileStorage, StorageError};
