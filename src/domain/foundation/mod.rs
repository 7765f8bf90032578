//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, the state machine trait and the error
//! types that the profile domain and the broker share.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ConnectionId, ProfileId, SubscriptionId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
