//! Cache Store Module
//!
//! Two-tier cache engine: a fast in-memory tier in front of an optional
//! durable SQLite tier, with TTL expiration. The store owns the public
//! contract: reads check memory first and fall back to the durable tier,
//! writes go through both, and durable-tier faults are absorbed here so
//! callers only ever see hits and misses.

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::cache::{CacheEntry, CacheStats, DurableTier, MemoryTier, TierLookup};
use crate::config::Config;

// == Cache Store ==
/// Two-tier result cache with time-based expiration.
///
/// All methods take `&self`; a store is shared across tasks behind an
/// `Arc`. Single-key atomicity comes from two coarse locks: the memory
/// tier's own lock keeps each tier operation atomic, and the store's
/// write gate serializes `set` and `delete` with the durable-consult
/// half of `get`, so a lookup that begins after a completed write
/// observes that write. Memory-tier hits never touch the gate.
pub struct CacheStore {
    /// Fast process-local tier, consulted first
    memory: MemoryTier,
    /// Persistent tier, `None` when the store runs memory-only
    durable: Option<DurableTier>,
    /// Serializes writes with durable reads and their repopulating
    /// memory inserts
    gate: Mutex<()>,
    /// Behavior counters
    stats: Mutex<CacheStats>,
    /// TTL applied when `set` is called without one
    default_ttl: Duration,
}

impl CacheStore {
    // == Constructors ==
    /// Creates a store over an explicit durable tier (or none). This is
    /// the dependency-injection constructor; it has no side effects.
    pub fn new(durable: Option<DurableTier>, default_ttl: Duration) -> Self {
        Self {
            memory: MemoryTier::new(),
            durable,
            gate: Mutex::new(()),
            stats: Mutex::new(CacheStats::new()),
            default_ttl,
        }
    }

    /// Opens the store described by `config`.
    ///
    /// If the durable tier cannot be opened the store degrades to
    /// memory-only operation with a logged warning; callers are never
    /// failed for it. Rows that expired while no process was running are
    /// evicted before the store is handed out.
    pub fn open(config: &Config) -> Self {
        let durable = match DurableTier::open(&config.db_path) {
            Ok(tier) => Some(tier),
            Err(err) => {
                warn!(
                    "cache database {} unavailable ({}), running memory-only",
                    config.db_path, err
                );
                None
            }
        };

        let store = Self::new(durable, Duration::from_secs(config.default_ttl));

        let removed = store.purge_expired();
        if removed > 0 {
            info!("startup eviction removed {} expired cache entries", removed);
        }

        store
    }

    // == Get ==
    /// Retrieves the value stored under `key`, or `None` if nothing live
    /// is stored there.
    ///
    /// The memory tier answers first. On a memory miss the durable tier is
    /// consulted, and a live row found there repopulates the memory tier
    /// with its original expiration before being returned. An expired
    /// entry in either tier is evicted and treated as absent. A durable
    /// fault is logged, counted and treated as a miss.
    ///
    /// The durable consult and the repopulating insert run under the
    /// store's write gate, so a `set` or `delete` that completes while
    /// this lookup is in flight is never overwritten by the older durable
    /// row.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Utc::now();

        match self.memory.get(key, now) {
            TierLookup::Hit(entry) => {
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_memory_hit();
                }
                return Some(entry.value);
            }
            TierLookup::Expired => {
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_expirations(1);
                }
            }
            TierLookup::Missing => {}
        }

        let durable = match &self.durable {
            Some(durable) => durable,
            None => {
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_miss();
                }
                return None;
            }
        };

        let _gate = self.gate.lock().unwrap();

        // A write may have landed between the unlocked memory check and
        // taking the gate; it wins over whatever the durable tier holds.
        if let TierLookup::Hit(entry) = self.memory.get(key, now) {
            if let Ok(mut stats) = self.stats.lock() {
                stats.record_memory_hit();
            }
            return Some(entry.value);
        }

        match durable.get(key, now) {
            Ok(TierLookup::Hit(entry)) => {
                self.memory.insert(key.to_string(), entry.clone());
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_durable_hit();
                }
                Some(entry.value)
            }
            Ok(TierLookup::Expired) => {
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_expirations(1);
                    stats.record_miss();
                }
                None
            }
            Ok(TierLookup::Missing) => {
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_miss();
                }
                None
            }
            Err(err) => {
                warn!("cache read failed for key {}: {}", key, err);
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_durable_error();
                    stats.record_miss();
                }
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key`, expiring `ttl` from now (or the
    /// configured default TTL when `ttl` is `None`).
    ///
    /// The memory write always stands. The durable write is best-effort:
    /// a failure is logged and counted, never surfaced. Overwriting an
    /// existing key replaces both its value and its expiration.
    pub fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) {
        let entry = CacheEntry::new(value.clone(), ttl.unwrap_or(self.default_ttl));

        let _gate = self.gate.lock().unwrap();
        self.memory.insert(key.to_string(), entry.clone());

        if let Some(durable) = &self.durable {
            if let Err(err) = durable.insert(key, &entry) {
                warn!("cache write failed for key {}: {}", key, err);
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_durable_error();
                }
            }
        }
    }

    // == Delete ==
    /// Removes `key` from both tiers. Deleting an absent key is a no-op.
    pub fn delete(&self, key: &str) {
        let _gate = self.gate.lock().unwrap();
        self.memory.remove(key);

        if let Some(durable) = &self.durable {
            if let Err(err) = durable.remove(key) {
                warn!("cache delete failed for key {}: {}", key, err);
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_durable_error();
                }
            }
        }
    }

    // == Purge Expired ==
    /// Removes every expired entry from both tiers, returning how many
    /// were dropped. Reads already evict lazily; this only reclaims space.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut removed = self.memory.purge_expired(now);

        if let Some(durable) = &self.durable {
            match durable.purge_expired(now) {
                Ok(count) => removed += count,
                Err(err) => {
                    warn!("cache purge failed: {}", err);
                    if let Ok(mut stats) = self.stats.lock() {
                        stats.record_durable_error();
                    }
                }
            }
        }

        if removed > 0 {
            if let Ok(mut stats) = self.stats.lock() {
                stats.record_expirations(removed);
            }
        }

        removed
    }

    // == Stats ==
    /// Returns a snapshot of the behavior counters.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.lock().unwrap().clone();
        stats.set_entries(self.memory.len());
        stats
    }

    // == Length ==
    /// Number of entries in the in-memory tier.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Returns true if the in-memory tier is empty.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Whether a durable tier is attached.
    pub fn is_durable(&self) -> bool {
        self.durable.is_some()
    }

    /// Number of rows in the durable tier, if one is attached and
    /// answering.
    pub fn durable_len(&self) -> Option<usize> {
        let durable = self.durable.as_ref()?;
        match durable.row_count() {
            Ok(count) => Some(count),
            Err(err) => {
                warn!("cache row count failed: {}", err);
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_durable_error();
                }
                None
            }
        }
    }
}
