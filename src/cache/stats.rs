//! Cache Statistics Module
//!
//! Tracks per-tier hits, misses, expirations and swallowed durable-tier
//! faults. The store never propagates a durable failure to its caller, so
//! this counter set is where those failures stay observable.

use serde::Serialize;

// == Cache Stats ==
/// Counters for cache behavior since the store was created.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Lookups answered by the in-memory tier
    pub memory_hits: u64,
    /// Lookups answered by the durable tier (and promoted to memory)
    pub durable_hits: u64,
    /// Lookups answered by neither tier
    pub misses: u64,
    /// Entries removed because their TTL had elapsed, lazily or by sweep
    pub expirations: u64,
    /// Durable-tier faults that were absorbed instead of propagated
    pub durable_errors: u64,
    /// Current number of entries in the in-memory tier
    pub entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Fraction of lookups answered by either tier, or 0.0 before any
    /// lookup has happened.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.durable_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    // == Recorders ==
    /// Increments the memory-tier hit counter.
    pub fn record_memory_hit(&mut self) {
        self.memory_hits += 1;
    }

    /// Increments the durable-tier hit counter.
    pub fn record_durable_hit(&mut self) {
        self.durable_hits += 1;
    }

    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Adds `count` expired-entry removals.
    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    /// Increments the swallowed durable-fault counter.
    pub fn record_durable_error(&mut self) {
        self.durable_errors += 1;
    }

    // == Update Entry Count ==
    /// Updates the in-memory entry count.
    pub fn set_entries(&mut self, count: usize) {
        self.entries = count;
    }
}
