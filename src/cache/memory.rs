//! In-Memory Tier
//!
//! Process-local storage tier: a HashMap behind one coarse mutex. Every
//! read-modify-write sequence (find an entry, notice it expired, evict it)
//! happens under a single lock acquisition, so concurrent callers never
//! observe a half-applied operation.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::cache::{CacheEntry, TierLookup};

// == Memory Tier ==
/// Fast process-local tier. All methods take `&self`; the tier is shared
/// through the store behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryTier {
    // == Constructor ==
    /// Creates an empty tier.
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Looks up a key as of `now`, evicting it under the same lock if it
    /// has expired.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> TierLookup {
        let mut entries = self.entries.lock().unwrap();

        match entries.get(key) {
            Some(entry) if entry.is_expired_at(now) => {
                entries.remove(key);
                TierLookup::Expired
            }
            Some(entry) => TierLookup::Hit(entry.clone()),
            None => TierLookup::Missing,
        }
    }

    // == Insert ==
    /// Stores an entry, replacing any previous one under the same key.
    pub fn insert(&self, key: String, entry: CacheEntry) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key, entry);
    }

    // == Remove ==
    /// Removes an entry, reporting whether one was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key).is_some()
    }

    // == Purge Expired ==
    /// Removes every entry expired at `now`, returning how many were
    /// dropped.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    // == Length ==
    /// Current number of entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Returns true if the tier holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn live_entry(value: serde_json::Value) -> CacheEntry {
        CacheEntry::new(value, Duration::from_secs(300))
    }

    fn expired_entry(value: serde_json::Value) -> CacheEntry {
        CacheEntry {
            value,
            expires_at: Utc::now() - chrono::Duration::seconds(1),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let tier = MemoryTier::new();
        tier.insert("k".to_string(), live_entry(json!([1, 2, 3])));

        match tier.get("k", Utc::now()) {
            TierLookup::Hit(entry) => assert_eq!(entry.value, json!([1, 2, 3])),
            other => panic!("expected hit, got {:?}", other),
        }
    }

    #[test]
    fn test_get_missing() {
        let tier = MemoryTier::new();
        assert!(matches!(tier.get("absent", Utc::now()), TierLookup::Missing));
    }

    #[test]
    fn test_expired_entry_is_evicted_on_get() {
        let tier = MemoryTier::new();
        tier.insert("k".to_string(), expired_entry(json!("old")));

        assert!(matches!(tier.get("k", Utc::now()), TierLookup::Expired));

        // The first lookup removed it; a second one sees plain absence.
        assert!(matches!(tier.get("k", Utc::now()), TierLookup::Missing));
        assert!(tier.is_empty());
    }

    #[test]
    fn test_insert_replaces() {
        let tier = MemoryTier::new();
        tier.insert("k".to_string(), live_entry(json!("v1")));
        tier.insert("k".to_string(), live_entry(json!("v2")));

        match tier.get("k", Utc::now()) {
            TierLookup::Hit(entry) => assert_eq!(entry.value, json!("v2")),
            other => panic!("expected hit, got {:?}", other),
        }
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_remove() {
        let tier = MemoryTier::new();
        tier.insert("k".to_string(), live_entry(json!(null)));

        assert!(tier.remove("k"));
        assert!(!tier.remove("k"));
        assert!(matches!(tier.get("k", Utc::now()), TierLookup::Missing));
    }

    #[test]
    fn test_purge_expired_removes_only_expired() {
        let tier = MemoryTier::new();
        tier.insert("dead1".to_string(), expired_entry(json!(1)));
        tier.insert("dead2".to_string(), expired_entry(json!(2)));
        tier.insert("live".to_string(), live_entry(json!(3)));

        assert_eq!(tier.purge_expired(Utc::now()), 2);
        assert_eq!(tier.len(), 1);
        assert!(matches!(tier.get("live", Utc::now()), TierLookup::Hit(_)));
    }
}
