//! Error types for the cache tiers
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Faults raised inside the cache tiers.
///
/// None of these cross the `CacheStore` boundary: the store absorbs them,
/// logs a warning, counts them in its statistics, and degrades the
/// operation to a miss (reads) or a memory-only write (writes).
#[derive(Error, Debug)]
pub enum CacheError {
    /// Durable tier (SQLite) failure
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Payload could not be serialized or deserialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure while preparing the database location
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A durable row whose stored payload or timestamp is unreadable
    #[error("corrupt cache row for key: {0}")]
    Corrupt(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache tiers.
pub type Result<T> = std::result::Result<T, CacheError>;
