//! Fragment cache storage.
//!
//! A process-wide TTL + LRU store of JSON values keyed by [`MemoKey`]. Callers
//! memoize expensive fragment computations through [`FragmentCache::memoize`].

use std::future::Future;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::MemoKey;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to encode value for `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

type Entries = LruCache<MemoKey, CacheEntry>;

/// Memoization store shared by every fragment producer and the page wrapper.
///
/// Writes are last-write-wins per key. Two concurrent fills of the same key
/// both run their computation; the later insert replaces the earlier one.
pub struct FragmentCache {
    entries: RwLock<Entries>,
}

impl FragmentCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    /// Return the live value stored under `key`, dropping it if it expired.
    pub fn get(&self, key: &MemoKey) -> Option<Value> {
        let now = Instant::now();
        let mut entries = self.write_entries("get");
        let lookup = entries
            .get(key)
            .map(|entry| (!entry.is_expired(now)).then(|| entry.value.clone()));

        match lookup {
            Some(Some(value)) => {
                counter!("stacks_cache_hit_total", "namespace" => key.namespace().to_string())
                    .increment(1);
                Some(value)
            }
            expired_or_missing => {
                if expired_or_missing.is_some() {
                    entries.pop(key);
                }
                counter!("stacks_cache_miss_total", "namespace" => key.namespace().to_string())
                    .increment(1);
                None
            }
        }
    }

    pub fn insert(&self, key: MemoKey, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let evicted = self.write_entries("insert").push(key.clone(), entry);

        match evicted {
            Some((evicted_key, _)) if evicted_key != key => {
                counter!(
                    "stacks_cache_evict_total",
                    "namespace" => evicted_key.namespace().to_string()
                )
                .increment(1);
            }
            _ => {}
        }
    }

    /// Remove `key`. Returns whether an entry was present.
    pub fn invalidate(&self, key: &MemoKey) -> bool {
        self.write_entries("invalidate").pop(key).is_some()
    }

    /// Whether a live entry exists for `key`, without touching LRU order.
    pub fn contains(&self, key: &MemoKey) -> bool {
        self.read_entries("contains")
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(Instant::now()))
    }

    pub fn len(&self) -> usize {
        self.read_entries("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compute-and-store memoization.
    ///
    /// Serves a live cached value when one exists; otherwise awaits `fill` and
    /// stores its output for `ttl`. A failed fill stores nothing. A cached
    /// value that no longer decodes as `T` is dropped and recomputed.
    ///
    /// Whatever is returned, if it is falsy (see [`is_falsy`]) the key is
    /// deleted before returning, so an empty result is served at most once
    /// from the cache.
    pub async fn memoize<T, E, F, Fut>(&self, key: MemoKey, ttl: Duration, fill: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let (value, encoded) = match self.cached::<T>(&key) {
            Some(hit) => {
                debug!(cache = "fragment", outcome = "hit", key = %key, "serving memoized value");
                hit
            }
            None => {
                debug!(cache = "fragment", outcome = "miss", key = %key, "filling memoized value");
                let value = fill().await?;
                let encoded = serde_json::to_value(&value).map_err(|source| CacheError::Encode {
                    key: key.to_string(),
                    source,
                })?;
                self.insert(key.clone(), encoded.clone(), ttl);
                (value, encoded)
            }
        };

        if is_falsy(&encoded) {
            self.invalidate(&key);
            counter!("stacks_cache_self_heal_total", "namespace" => key.namespace().to_string())
                .increment(1);
            debug!(cache = "fragment", outcome = "self_heal", key = %key, "dropped empty value");
        }

        Ok(value)
    }

    // Poisoned locks are recovered. Entries still expire on their TTL.
    fn read_entries(&self, op: &'static str) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!(cache = "fragment", op, "recovered poisoned entries lock");
            poisoned.into_inner()
        })
    }

    fn write_entries(&self, op: &'static str) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!(cache = "fragment", op, "recovered poisoned entries lock");
            poisoned.into_inner()
        })
    }

    fn cached<T: DeserializeOwned>(&self, key: &MemoKey) -> Option<(T, Value)> {
        let encoded = self.get(key)?;
        match serde_json::from_value::<T>(encoded.clone()) {
            Ok(value) => Some((value, encoded)),
            Err(err) => {
                warn!(
                    cache = "fragment",
                    outcome = "corrupt",
                    key = %key,
                    error = %err,
                    "dropping undecodable cache entry"
                );
                self.invalidate(key);
                None
            }
        }
    }
}

/// Truthiness of a cached value: null, `false`, zero, and empty strings,
/// arrays or objects are falsy.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}
