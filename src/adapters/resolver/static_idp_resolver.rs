//! Table-driven IdpResolver.
//!
//! Answers from a fixed WebID → issuers map. Stands in for a real profile
//! document lookup in tests and local setups.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::ports::{IdpResolver, ResolutionError};

#[derive(Debug, Clone, Default)]
pub struct StaticIdpResolver {
    issuers: HashMap<String, Vec<String>>,
}

impl StaticIdpResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `issuer` for `web_id`. Repeated calls append.
    pub fn with_issuer(mut self, web_id: impl Into<String>, issuer: impl Into<String>) -> Self {
        self.issuers.entry(web_id.into()).or_default().push(issuer.into());
        self
    }

    /// Register a WebID whose document advertises no issuer.
    pub fn with_empty(mut self, web_id: impl Into<String>) -> Self {
        self.issuers.entry(web_id.into()).or_default();
        self
    }
}

#[async_trait]
impl IdpResolver for StaticIdpResolver {
    async fn resolve(&self, web_id: &str) -> Result<Vec<String>, ResolutionError> {
        self.issuers
            .get(web_id)
            .cloned()
            .ok_or_else(|| ResolutionError::new(web_id, "profile document not found"))
    }
}
