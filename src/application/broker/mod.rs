//! Message broker between the profile store and its clients.
//!
//! - `messages` - wire protocol
//! - `connection` - client roles and the client-side connection handle
//! - `registry` - live connections owned by the broker task
//! - `router` - the broker task and its handle

mod connection;
pub mod messages;
mod registry;
mod router;

pub use connection::{ClientConnection, ClientRole};
pub use messages::{
    BrokerMessage, ClientRequest, CommandFailure, FrameError, ProfileRef, ResolutionFailure,
    SelectRequest, UpdateProfileRequest,
};
pub use registry::{ConnectionRegistry, ConnectionSummary};
pub use router::{Broker, BrokerHandle, BrokerStatus};
