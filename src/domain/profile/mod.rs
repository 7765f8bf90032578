//! Profile module - identity profiles and the active-identity pointer.
//!
//! # Domain Invariants
//!
//! 1. Profile ids are unique and never reused
//! 2. Every accepted profile has exactly one of `idp` or `webID`
//! 3. The display name is never blank
//! 4. The active pointer only references existing profiles

mod active_identity;
mod color;
mod errors;
#[allow(clippy::module_inception)]
mod profile;

pub use active_identity::ActiveIdentity;
pub use color::{ProfileColor, PALETTE};
pub use errors::ProfileError;
pub use profile::{IdentitySource, Metadata, Profile, ProfileDraft, ProfilePatch};
