//! Broker message types.
//!
//! Every frame is an object `{type, data?}`:
//! - Client → Broker: queries and commands ([`ClientRequest`])
//! - Broker → Client: snapshots and errors ([`BrokerMessage`])

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ProfileId};
use crate::domain::profile::{Profile, ProfileDraft, ProfilePatch};

// ============================================
// Client → Broker
// ============================================

/// Everything a client may ask of the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientRequest {
    /// Reply with the full identity list.
    RequestIdentities,

    /// Reply with the active identity (or null).
    RequestActiveIdentity,

    CreateProfile(ProfileDraft),

    UpdateProfile(UpdateProfileRequest),

    DeleteProfile(ProfileRef),

    /// Select a profile, or clear the selection with `id: null`.
    SetActiveIdentity(SelectRequest),
}

/// Payload of `update-profile`: the target id plus the fields to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub id: ProfileId,
    #[serde(flatten)]
    pub patch: ProfilePatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRef {
    pub id: ProfileId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectRequest {
    #[serde(default)]
    pub id: Option<ProfileId>,
}

/// Why an inbound frame could not be turned into a [`ClientRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Non-conformal message detected, omitting...")]
    Untagged,

    #[error("Unknown message type '{0}'")]
    UnknownType(String),

    #[error("Invalid payload for '{kind}': {reason}")]
    InvalidPayload { kind: String, reason: String },
}

impl ClientRequest {
    /// Wire names of every request the broker understands.
    pub const KINDS: &'static [&'static str] = &[
        "request-identities",
        "request-active-identity",
        "create-profile",
        "update-profile",
        "delete-profile",
        "set-active-identity",
    ];

    /// Decode a raw frame.
    ///
    /// Frames without a string `type` and frames of an unknown type are
    /// reported separately from known types with a malformed `data`.
    pub fn parse(frame: Value) -> Result<Self, FrameError> {
        let kind = frame
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(FrameError::Untagged)?;

        // queries carry no payload; whatever `data` holds is ignored
        match kind.as_str() {
            "request-identities" => return Ok(ClientRequest::RequestIdentities),
            "request-active-identity" => return Ok(ClientRequest::RequestActiveIdentity),
            k if !Self::KINDS.contains(&k) => return Err(FrameError::UnknownType(kind)),
            _ => {}
        }

        serde_json::from_value(frame).map_err(|e| FrameError::InvalidPayload {
            kind,
            reason: e.to_string(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientRequest::RequestIdentities => "request-identities",
            ClientRequest::RequestActiveIdentity => "request-active-identity",
            ClientRequest::CreateProfile(_) => "create-profile",
            ClientRequest::UpdateProfile(_) => "update-profile",
            ClientRequest::DeleteProfile(_) => "delete-profile",
            ClientRequest::SetActiveIdentity(_) => "set-active-identity",
        }
    }

    /// Queries are answered to the sender only and never mutate state.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            ClientRequest::RequestIdentities | ClientRequest::RequestActiveIdentity
        )
    }
}

// ============================================
// Broker → Client
// ============================================

/// Everything the broker sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum BrokerMessage {
    /// Full identity list in insertion order.
    AllIdentitiesResponse(Vec<Profile>),

    /// The active identity, `null` when none is selected.
    ActiveIdentityResponse(Option<Profile>),

    /// The selected WebID did not resolve to an identity provider.
    ActiveIdentityResponseError(ResolutionFailure),

    /// A command was rejected. Sent to the originator only.
    CommandError(CommandFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionFailure {
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailure {
    /// Wire name of the rejected command.
    pub command: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl CommandFailure {
    pub fn new(command: impl Into<String>, display_name: Option<String>, error: DomainError) -> Self {
        Self {
            command: command.into(),
            code: error.code.to_string(),
            message: error.message,
            display_name,
        }
    }
}

impl BrokerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            BrokerMessage::AllIdentitiesResponse(_) => "all-identities-response",
            BrokerMessage::ActiveIdentityResponse(_) => "active-identity-response",
            BrokerMessage::ActiveIdentityResponseError(_) => "active-identity-response-error",
            BrokerMessage::CommandError(_) => "command-error",
        }
    }
}
