//! Profile aggregate and the write-side value objects that shape it.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::foundation::{ProfileId, ValidationError};

use super::ProfileColor;

/// Open key/value annotations attached to a profile after creation.
pub type Metadata = BTreeMap<String, Value>;

const IDP_FIELD: &str = "idp";
const WEB_ID_FIELD: &str = "webID";
const DISPLAY_NAME_FIELD: &str = "displayName";

/// Where a profile authenticates: an identity provider origin or a WebID.
///
/// Exactly one is present on every accepted profile. On the wire this is
/// flattened into the two optional keys `idp` and `webID`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SourceFields", into = "SourceFields")]
pub enum IdentitySource {
    Idp(String),
    WebId(String),
}

impl IdentitySource {
    /// Builds a source from the two optional wire fields.
    ///
    /// Blank values count as absent. Both present or both absent is a
    /// validation error; the store never picks one on the caller's behalf.
    pub fn from_fields(idp: Option<&str>, web_id: Option<&str>) -> Result<Self, ValidationError> {
        match (non_blank(idp), non_blank(web_id)) {
            (Some(idp), None) => Ok(IdentitySource::Idp(idp)),
            (None, Some(web_id)) => Ok(IdentitySource::WebId(web_id)),
            _ => Err(ValidationError::exactly_one(IDP_FIELD, WEB_ID_FIELD)),
        }
    }

    pub fn idp(&self) -> Option<&str> {
        match self {
            IdentitySource::Idp(idp) => Some(idp),
            IdentitySource::WebId(_) => None,
        }
    }

    pub fn web_id(&self) -> Option<&str> {
        match self {
            IdentitySource::WebId(web_id) => Some(web_id),
            IdentitySource::Idp(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SourceFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    idp: Option<String>,
    #[serde(rename = "webID", default, skip_serializing_if = "Option::is_none")]
    web_id: Option<String>,
}

impl TryFrom<SourceFields> for IdentitySource {
    type Error = ValidationError;

    fn try_from(fields: SourceFields) -> Result<Self, Self::Error> {
        IdentitySource::from_fields(fields.idp.as_deref(), fields.web_id.as_deref())
    }
}

impl From<IdentitySource> for SourceFields {
    fn from(source: IdentitySource) -> Self {
        match source {
            IdentitySource::Idp(idp) => SourceFields {
                idp: Some(idp),
                web_id: None,
            },
            IdentitySource::WebId(web_id) => SourceFields {
                idp: None,
                web_id: Some(web_id),
            },
        }
    }
}

/// A named shortcut to an identity provider or WebID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    id: ProfileId,
    display_name: String,
    #[serde(flatten)]
    source: IdentitySource,
    #[serde(default)]
    color: ProfileColor,
    #[serde(default)]
    metadata: Metadata,
}

impl Profile {
    /// Validates a draft and turns it into a profile carrying `id`.
    pub fn create(id: ProfileId, draft: ProfileDraft) -> Result<Self, ValidationError> {
        let display_name = normalize_display_name(&draft.display_name)?;
        let source = IdentitySource::from_fields(draft.idp.as_deref(), draft.web_id.as_deref())?;

        Ok(Self {
            id,
            display_name,
            source,
            color: draft.color.unwrap_or_default(),
            metadata: draft.metadata,
        })
    }

    /// Returns a copy of this profile with `patch` merged in.
    ///
    /// Fields absent from the patch keep their value. The idp/webID pair is
    /// re-validated after the merge, so switching from one to the other
    /// needs the patch to clear the old field explicitly.
    pub fn apply(&self, patch: &ProfilePatch) -> Result<Self, ValidationError> {
        let display_name = match &patch.display_name {
            Some(name) => normalize_display_name(name)?,
            None => self.display_name.clone(),
        };

        let idp = match &patch.idp {
            Some(value) => value.clone(),
            None => self.source.idp().map(str::to_string),
        };
        let web_id = match &patch.web_id {
            Some(value) => value.clone(),
            None => self.source.web_id().map(str::to_string),
        };
        let source = IdentitySource::from_fields(idp.as_deref(), web_id.as_deref())?;

        let mut metadata = self.metadata.clone();
        if let Some(changes) = &patch.metadata {
            for (key, value) in changes {
                if value.is_null() {
                    metadata.remove(key);
                } else {
                    metadata.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(Self {
            id: self.id,
            display_name,
            source,
            color: patch.color.clone().unwrap_or_else(|| self.color.clone()),
            metadata,
        })
    }

    /// Re-checks invariants that deserialization alone does not enforce.
    pub fn validate(&self) -> Result<(), ValidationError> {
        normalize_display_name(&self.display_name).map(|_| ())
    }

    pub fn id(&self) -> ProfileId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn source(&self) -> &IdentitySource {
        &self.source
    }

    pub fn idp(&self) -> Option<&str> {
        self.source.idp()
    }

    pub fn web_id(&self) -> Option<&str> {
        self.source.web_id()
    }

    pub fn color(&self) -> &ProfileColor {
        &self.color
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Fields supplied by a client when creating a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDraft {
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp: Option<String>,
    #[serde(rename = "webID", default, skip_serializing_if = "Option::is_none")]
    pub web_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ProfileColor>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl ProfileDraft {
    pub fn with_idp(display_name: impl Into<String>, idp: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            idp: Some(idp.into()),
            ..Default::default()
        }
    }

    pub fn with_web_id(display_name: impl Into<String>, web_id: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            web_id: Some(web_id.into()),
            ..Default::default()
        }
    }
}

/// Partial replacement of a profile's fields.
///
/// For `idp` and `webID` the outer `Option` says whether the key was sent
/// at all; `null` (or a blank string) clears the field. Metadata entries
/// are merged key by key, and a `null` value removes the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub idp: Option<Option<String>>,
    #[serde(
        rename = "webID",
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub web_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ProfileColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl ProfilePatch {
    /// Patch that only sets one metadata entry.
    pub fn annotate(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(key.into(), value.into());
        Self {
            metadata: Some(metadata),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &ProfilePatch::default()
    }
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn normalize_display_name(name: &str) -> Result<String, ValidationError> {
    non_blank(Some(name)).ok_or_else(|| ValidationError::empty_field(DISPLAY_NAME_FIELD))
}
