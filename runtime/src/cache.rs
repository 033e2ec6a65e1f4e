//! Cache bridge: key resolution and JSON read/write through a [`CacheStore`].
//!
//! The store itself is an injected capability; the bridge only computes keys
//! from configuration and payload, serializes payloads to JSON strings, and
//! degrades gracefully when entries fail to decode.

use reqflow_core::capability::CacheStore;
use reqflow_core::source::ValueSource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Resolve the configured cache key for this payload, treating an empty
/// resolution as "no caching".
pub(crate) fn resolve_key<P>(
    key: Option<&ValueSource<String, P>>,
    payload: Option<&P>,
) -> Option<String> {
    key.map(|source| source.resolve(payload))
        .filter(|key| !key.is_empty())
}

/// Read and decode a cached payload. Undecodable entries are dropped from
/// the store and treated as a miss.
pub(crate) fn read<T: DeserializeOwned>(store: &dyn CacheStore, key: &str) -> Option<T> {
    let Some(entry) = store.get(key) else {
        metrics::counter!("operation.cache_misses").increment(1);
        return None;
    };
    match serde_json::from_str(&entry) {
        Ok(value) => {
            metrics::counter!("operation.cache_hits").increment(1);
            Some(value)
        }
        Err(error) => {
            tracing::warn!(key, %error, "dropping undecodable cache entry");
            store.delete(key);
            metrics::counter!("operation.cache_misses").increment(1);
            None
        }
    }
}

/// Serialize and store a payload. Unserializable payloads are skipped with a
/// warning.
pub(crate) fn write<T: Serialize>(store: &dyn CacheStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(entry) => store.set(key, entry),
        Err(error) => tracing::warn!(key, %error, "skipping unserializable cache write"),
    }
}

/// In-memory [`CacheStore`] backed by a mutex-guarded map.
///
/// Suitable for per-process response caching and tests; bring your own store
/// for eviction policies or persistence.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
    }

    fn delete(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_key_skips_empty() {
        let key: Option<ValueSource<String, u32>> = Some(ValueSource::Literal(String::new()));
        assert_eq!(resolve_key(key.as_ref(), None), None);

        let key: Option<ValueSource<String, u32>> =
            Some(ValueSource::compute(|p: Option<&u32>| {
                p.map(|id| format!("user:{id}")).unwrap_or_default()
            }));
        assert_eq!(resolve_key(key.as_ref(), Some(&3)), Some("user:3".into()));
        assert_eq!(resolve_key(key.as_ref(), None), None);
    }

    #[test]
    fn roundtrip_through_memory_cache() {
        let cache = MemoryCache::new();
        write(&cache, "k", &json!({ "test": 1 }));
        assert_eq!(read::<serde_json::Value>(&cache, "k"), Some(json!({ "test": 1 })));
        cache.delete("k");
        assert!(cache.is_empty());
    }

    #[test]
    fn undecodable_entry_is_dropped() {
        let cache = MemoryCache::new();
        cache.set("k", "not json".to_owned());
        assert_eq!(read::<u32>(&cache, "k"), None);
        assert!(cache.get("k").is_none());
    }
}
