//! Store configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::persist::Codec;

/// Storage key of the reading lists.
pub const DEFAULT_STORAGE_KEY: &str = "@lists";

/// Configuration for the store and its default gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key of the single slot the collection is stored under.
    pub storage_key: String,

    /// Encoding of the stored collection.
    pub codec: Codec,

    /// Retry behavior of the persistence worker.
    pub persist: PersistConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            codec: Codec::default(),
            persist: PersistConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Retry behavior of the persistence worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Delay before the first retry of a failed load or save. A load that
    /// fails with an I/O error is retried until it succeeds or the store
    /// shuts down; malformed data is never retried.
    pub retry_backoff_ms: u64,

    /// Upper bound of the doubling retry delay.
    pub max_backoff_ms: u64,

    /// Attempts at the final save when the worker shuts down.
    pub shutdown_attempts: u32,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            retry_backoff_ms: 50,
            max_backoff_ms: 5_000,
            shutdown_attempts: 3,
        }
    }
}

impl PersistConfig {
    /// Delay before retry number `failures` (1-based), doubling each time up
    /// to `max_backoff_ms`.
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        let ms = self
            .retry_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms.max(self.retry_backoff_ms));
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.storage_key, "@lists");
        assert_eq!(config.codec, Codec::Json);
        assert_eq!(config.persist.shutdown_attempts, 3);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            StoreConfig::from_json(r#"{ "codec": "bitcode", "persist": { "max_backoff_ms": 200 } }"#)
                .unwrap();
        assert_eq!(config.codec, Codec::Bitcode);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.persist.max_backoff_ms, 200);
        assert_eq!(config.persist.retry_backoff_ms, 50);
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        assert!(StoreConfig::from_json(r#"{ "codec": "yaml" }"#).is_err());
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let persist = PersistConfig {
            retry_backoff_ms: 10,
            max_backoff_ms: 50,
            ..Default::default()
        };
        assert_eq!(persist.backoff(1), Duration::from_millis(10));
        assert_eq!(persist.backoff(2), Duration::from_millis(20));
        assert_eq!(persist.backoff(3), Duration::from_millis(40));
        assert_eq!(persist.backoff(4), Duration::from_millis(50));
        assert_eq!(persist.backoff(100), Duration::from_millis(50));
    }
}
