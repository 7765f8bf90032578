//! IdpResolver port - WebID to identity-provider discovery.
//!
//! The lookup itself (fetching the profile document and reading its
//! `solid:oidcIssuer` triples) lives outside this crate. The broker only
//! needs to know whether a selected WebID resolves to at least one issuer.

use async_trait::async_trait;

/// A WebID whose identity provider could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unable to retrieve IDP from WebID {web_id}: {reason}")]
pub struct ResolutionError {
    pub web_id: String,
    pub reason: String,
}

impl ResolutionError {
    pub fn new(web_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            web_id: web_id.into(),
            reason: reason.into(),
        }
    }
}

/// Port for discovering the OIDC issuers advertised by a WebID.
#[async_trait]
pub trait IdpResolver: Send + Sync {
    /// Returns the issuers for `web_id`, most preferred first.
    ///
    /// An empty list is a valid answer; callers treat it as unresolved.
    async fn resolve(&self, web_id: &str) -> Result<Vec<String>, ResolutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn IdpResolver) {}

    #[test]
    fn resolution_error_names_the_web_id() {
        let err = ResolutionError::new("https://x/card#me", "no issuer");
        assert_eq!(
            err.to_string(),
            "Unable to retrieve IDP from WebID https://x/card#me: no issuer"
        );
    }
}
