//! Keyed cache of API reads with a stale time

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

struct CachedEntry {
    value: Value,
    fetched_at: Instant,
}

/// Response cache shared by clones of one client.
///
/// Entries older than the stale time are dropped on read. Writes never
/// touch the cache; callers invalidate by key prefix after a mutation.
pub struct QueryCache {
    entries: DashMap<String, CachedEntry>,
    stale_time: Duration,
}

impl QueryCache {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            stale_time,
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    /// Fresh value for `key`, if any
    pub fn get(&self, key: &str) -> Option<Value> {
        {
            let entry = self.entries.get(key)?;
            if entry.fetched_at.elapsed() < self.stale_time {
                return Some(entry.value.clone());
            }
        }

        // read guard must be released before removing
        self.entries
            .remove_if(key, |_, entry| entry.fetched_at.elapsed() >= self.stale_time);
        debug!(key, "Dropped stale cache entry");
        None
    }

    pub fn put(&self, key: impl Into<String>, value: Value) {
        self.entries.insert(
            key.into(),
            CachedEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Remove every entry whose key starts with `prefix`; returns how many went
    pub fn invalidate(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - self.entries.len();
        debug!(prefix, removed, "Invalidated cache entries");
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fresh_entries_are_served() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.put("stores:list:{}", json!({"stores": []}));

        assert_eq!(cache.get("stores:list:{}"), Some(json!({"stores": []})));
        assert_eq!(cache.get("stores:mine"), None);
    }

    #[test]
    fn test_stale_entries_are_dropped() {
        let cache = QueryCache::new(Duration::ZERO);
        cache.put("profile:me", json!({"id": 1}));

        assert_eq!(cache.get("profile:me"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_by_prefix() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.put("stores:list:a", json!(1));
        cache.put("stores:list:b", json!(2));
        cache.put("stores:42", json!(3));
        cache.put("campaigns:list:a", json!(4));

        assert_eq!(cache.invalidate("stores:list:"), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.invalidate("stores:"), 1);
        assert!(cache.get("campaigns:list:a").is_some());

        cache.clear();
        assert!(cache.is_empty());
    }
}
