//! Cache Module
//!
//! Two-tier result cache: an in-memory tier over an optional durable
//! SQLite tier, with TTL expiration and the shared key convention.

mod durable;
mod entry;
mod key;
mod memory;
mod stats;
mod store;


// Re-export public types
pub use durable::DurableTier;
pub use entry::{CacheEntry, TierLookup};
pub use key::{KeyBuilder, Operation};
pub use memory::MemoryTier;
pub use stats::CacheStats;
pub use store::CacheStore;
