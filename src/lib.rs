//! Lexicache - a two-tier result cache for lexical-graph applications
//!
//! Fronts expensive text generation, knowledge-base and graph operations
//! with an in-memory tier backed by an optional durable SQLite tier, under
//! deterministic per-operation keys and time-based expiration.

pub mod cache;
pub mod config;
pub mod error;
pub mod service;
pub mod tasks;

pub use cache::{CacheStats, CacheStore, KeyBuilder, Operation};
pub use config::Config;
pub use error::CacheError;
pub use service::LexicalService;
pub use tasks::spawn_sweep_task;
