//! Broker and bridge behaviour flags

use serde::Deserialize;

/// Broker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Select a profile as soon as it is created
    #[serde(default = "default_true")]
    pub activate_on_create: bool,

    /// Upper bound on one WebID lookup, in milliseconds
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            activate_on_create: true,
            resolve_timeout_ms: default_resolve_timeout_ms(),
        }
    }
}

/// External bridge configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Consecutive failed reconnects before giving up; 0 retries forever
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl BridgeConfig {
    /// The attempt cap, or `None` when unbounded.
    pub fn reconnect_limit(&self) -> Option<u32> {
        (self.max_reconnect_attempts > 0).then_some(self.max_reconnect_attempts)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_resolve_timeout_ms() -> u64 {
    2_000
}

fn default_max_reconnect_attempts() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_activates_on_create_by_default() {
        assert!(BrokerConfig::default().activate_on_create);
        assert_eq!(BrokerConfig::default().resolve_timeout_ms, 2_000);
    }

    #[test]
    fn zero_attempts_means_unbounded() {
        let config = BridgeConfig {
            max_reconnect_attempts: 0,
        };
        assert_eq!(config.reconnect_limit(), None);
        assert_eq!(BridgeConfig::default().reconnect_limit(), Some(10));
    }
}
