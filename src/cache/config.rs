//! Cache configuration.
//!
//! Deserialized from the `[cache]` table of `tagcache.toml` or the
//! `TAGCACHE__CACHE__*` environment variables.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use super::keys::KeyPart;

const DEFAULT_STORE_CAPACITY: usize = 10_000;
const DEFAULT_TTL_SECS: u64 = 30 * 60;

/// Cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable lifecycle reactions. Views work regardless.
    pub enabled: bool,
    /// Maximum entries held by the in-memory store before LRU eviction.
    pub store_capacity: usize,
    /// TTL applied by callers that do not choose one.
    pub default_ttl_secs: u64,
    /// Namespace segments prefixed to every key a registry builds.
    pub default_keys: Vec<String>,
    /// Re-cache objects on created/updated/restored instead of only busting.
    pub populate_on_write: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            store_capacity: DEFAULT_STORE_CAPACITY,
            default_ttl_secs: DEFAULT_TTL_SECS,
            default_keys: Vec::new(),
            populate_on_write: true,
        }
    }
}

impl CacheConfig {
    /// Returns true when lifecycle signals should reach the store.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the store capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn store_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.store_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn default_key_parts(&self) -> Vec<KeyPart> {
        self.default_keys.iter().cloned().map(KeyPart::Text).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert!(config.populate_on_write);
        assert_eq!(config.store_capacity, 10_000);
        assert_eq!(config.default_ttl(), Duration::from_secs(1800));
        assert!(config.default_keys.is_empty());
    }

    #[test]
    fn is_disabled_when_switched_off() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(!config.is_enabled());
        assert!(CacheConfig::default().is_enabled());
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            store_capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.store_capacity_non_zero().get(), 1);
    }

    #[test]
    fn default_keys_become_text_parts() {
        let config = CacheConfig {
            default_keys: vec!["tenant-3".to_string()],
            ..Default::default()
        };
        assert_eq!(
            config.default_key_parts(),
            vec![KeyPart::Text("tenant-3".to_string())]
        );
    }
}
