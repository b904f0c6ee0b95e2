//! A small TTL cache for `*/list` results (spec §3 supplement).
//!
//! The teacher's workspace reaches for `moka` for general-purpose caching,
//! but this runtime's cache has exactly one shape (a method name to a JSON
//! array, expiring after a fixed TTL) and no need for size-based eviction,
//! so a hand-rolled `DashMap<String, Entry>` is simpler than pulling in a
//! full cache crate for one use site.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Entry {
    value: Value,
    expires_at: Instant,
}

/// Caches the result of list-style requests (`tools/list`,
/// `resources/list`, `prompts/list`, `resources/templates/list`) for a
/// fixed TTL, invalidated early by a `list_changed` notification.
pub struct ListCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl ListCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// A cached value for `method`, if present and not yet expired.
    pub fn get(&self, method: &str) -> Option<Value> {
        let entries = self.entries.read();
        let entry = entries.get(method)?;
        if Instant::now() >= entry.expires_at {
            None
        } else {
            Some(entry.value.clone())
        }
    }

    pub fn put(&self, method: impl Into<String>, value: Value) {
        self.entries.write().insert(
            method.into(),
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop a single cached entry, e.g. in response to the corresponding
    /// `notifications/*/list_changed`.
    pub fn invalidate(&self, method: &str) {
        self.entries.write().remove(method);
    }

    pub fn invalidate_all(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_then_get_returns_cached_value() {
        let cache = ListCache::new(Duration::from_secs(60));
        cache.put("tools/list", json!({"tools": []}));
        assert_eq!(cache.get("tools/list"), Some(json!({"tools": []})));
    }

    #[test]
    fn get_after_ttl_expires_returns_none() {
        let cache = ListCache::new(Duration::from_millis(1));
        cache.put("tools/list", json!({"tools": []}));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("tools/list").is_none());
    }

    #[test]
    fn invalidate_drops_entry_immediately() {
        let cache = ListCache::new(Duration::from_secs(60));
        cache.put("tools/list", json!({"tools": []}));
        cache.invalidate("tools/list");
        assert!(cache.get("tools/list").is_none());
    }

    #[test]
    fn invalidate_all_clears_every_entry() {
        let cache = ListCache::new(Duration::from_secs(60));
        cache.put("tools/list", json!([]));
        cache.put("prompts/list", json!([]));
        cache.invalidate_all();
        assert!(cache.get("tools/list").is_none());
        assert!(cache.get("prompts/list").is_none());
    }
}
