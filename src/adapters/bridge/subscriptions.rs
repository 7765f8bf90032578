//! Active-identity subscribers of a bridge.
//!
//! One replaceable primary handler (`on_identity_changed`) plus any number
//! of keyed subscribers that do not displace each other.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::foundation::SubscriptionId;
use crate::domain::profile::Profile;

/// Callback invoked with the active identity, `None` when unset.
pub type IdentityHandler = Arc<dyn Fn(Option<&Profile>) + Send + Sync>;

#[derive(Default)]
pub struct SubscriptionRegistry {
    primary: Option<IdentityHandler>,
    subscribers: BTreeMap<SubscriptionId, IdentityHandler>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the primary handler. Returns whether one was replaced.
    pub fn replace_primary(&mut self, handler: IdentityHandler) -> bool {
        self.primary.replace(handler).is_some()
    }

    pub fn subscribe(&mut self, id: SubscriptionId, handler: IdentityHandler) {
        self.subscribers.insert(id, handler);
    }

    pub fn unsubscribe(&mut self, id: &SubscriptionId) -> bool {
        self.subscribers.remove(id).is_some()
    }

    /// Call every handler once. Returns how many were called.
    pub fn notify(&self, active: Option<&Profile>) -> usize {
        let mut called = 0;
        if let Some(primary) = &self.primary {
            primary(active);
            called += 1;
        }
        for handler in self.subscribers.values() {
            handler(active);
            called += 1;
        }
        called
    }

    pub fn len(&self) -> usize {
        self.subscribers.len() + usize::from(self.primary.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("primary", &self.primary.is_some())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
