//! Identifier newtypes. All are random UUID v4.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

uuid_id! {
    /// Identity of a stored profile. Assigned on create from a fresh v4 UUID.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    ProfileId
}

uuid_id! {
    /// One live client connection. Never persisted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    ConnectionId
}

uuid_id! {
    /// Handle for an extra bridge subscriber.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    SubscriptionId
}

impl FromStr for ProfileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_profile_ids_differ() {
        assert_ne!(ProfileId::new(), ProfileId::new());
    }

    #[test]
    fn profile_id_parses_its_own_display() {
        let id = ProfileId::new();
        assert_eq!(id.to_string().parse::<ProfileId>().unwrap(), id);
        assert!("not-a-uuid".parse::<ProfileId>().is_err());
    }

    #[test]
    fn profile_id_is_a_bare_json_string() {
        let id = ProfileId::new();
        assert_eq!(serde_json::to_value(id).unwrap(), serde_json::json!(id.to_string()));
    }

    #[test]
    fn connection_and_subscription_ids_display_as_uuids() {
        assert_eq!(ConnectionId::new().to_string().len(), 36);
        assert_eq!(SubscriptionId::new().to_string().len(), 36);
    }
}
