//! Cache configuration.
//!
//! Controls the fragment cache capacity and the TTLs used by its callers via
//! the `[cache]` section of `stacks.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CAPACITY: usize = 1000;
const DEFAULT_PAGE_TTL_SECS: u64 = 5 * 60;
const DEFAULT_WIDGET_TTL_SECS: u64 = 12 * 60 * 60;

/// Cache configuration from `stacks.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of memoized entries before LRU eviction.
    pub capacity: usize,
    /// TTL for whole collection pages.
    pub page_ttl_seconds: u64,
    /// TTL for memoized widget fragments.
    pub widget_ttl_seconds: u64,
    /// Memoize widget fragments (related works carousels).
    pub enable_widget_cache: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            page_ttl_seconds: DEFAULT_PAGE_TTL_SECS,
            widget_ttl_seconds: DEFAULT_WIDGET_TTL_SECS,
            enable_widget_cache: true,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            capacity: settings.capacity.get(),
            page_ttl_seconds: settings.page_ttl.as_secs(),
            widget_ttl_seconds: settings.widget_ttl.as_secs(),
            enable_widget_cache: settings.enable_widget_cache,
        }
    }
}

impl CacheConfig {
    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl_seconds)
    }

    pub fn widget_ttl(&self) -> Duration {
        Duration::from_secs(self.widget_ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.page_ttl(), Duration::from_secs(300));
        assert_eq!(config.widget_ttl(), Duration::from_secs(43_200));
        assert!(config.enable_widget_cache);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.capacity_non_zero().get(), 1);
    }

    #[test]
    fn deserializes_partial_tables() {
        let config: CacheConfig =
            toml::from_str("page_ttl_seconds = 60").expect("partial cache table parses");
        assert_eq!(config.page_ttl_seconds, 60);
        assert_eq!(config.capacity, 1000);
    }
}
