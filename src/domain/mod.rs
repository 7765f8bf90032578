//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `profile` - Identity profiles and the active-identity state machine

pub mod foundation;
pub mod profile;
