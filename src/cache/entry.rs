//! Cache Entry Module
//!
//! Defines the stored unit shared by both tiers and the three-way outcome
//! of a single-tier lookup.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

// == Cache Entry ==
/// A cached JSON document together with its absolute expiration instant.
///
/// Both tiers hold the same shape: the in-memory tier stores it directly,
/// the durable tier persists the value as JSON text next to the expiration
/// timestamp. A lookup always hands back an owned clone, never a reference
/// into a tier.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored JSON document
    pub value: Value,
    /// Absolute expiration instant
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry that expires `ttl` from now.
    pub fn new(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: expiry_instant(Utc::now(), ttl),
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is logically absent at `now`.
    ///
    /// Boundary condition: an entry expires strictly after its expiration
    /// instant, so it is still returned at exactly `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Checks whether the entry has expired as of the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

// == Tier Lookup ==
/// Outcome of a lookup against a single tier.
///
/// `Expired` is distinct from `Missing` so the store can count lazy
/// evictions separately from plain misses.
#[derive(Debug)]
pub enum TierLookup {
    /// A live entry
    Hit(CacheEntry),
    /// An entry was present but past its expiration; the tier evicted it
    Expired,
    /// No entry under this key
    Missing,
}

// == Utility Functions ==
/// Computes `now + ttl`, clamping to the latest representable instant
/// instead of overflowing.
pub fn expiry_instant(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
