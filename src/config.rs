//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Durable tier database file location
    pub db_path: String,
    /// Default TTL in seconds for entries stored without an explicit TTL
    pub default_ttl: u64,
    /// Background expiration sweep interval in seconds
    pub sweep_interval: u64,
    /// Generation model used when a caller does not pick one
    pub default_model: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `LEXICACHE_DB_PATH` - Cache database file (default: lexicache.db)
    /// - `LEXICACHE_DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `LEXICACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `LEXICACHE_DEFAULT_MODEL` - Fallback generation model (default: gemini-2.0-flash)
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("LEXICACHE_DB_PATH").unwrap_or_else(|_| "lexicache.db".to_string()),
            default_ttl: env::var("LEXICACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            sweep_interval: env::var("LEXICACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            default_model: env::var("LEXICACHE_DEFAULT_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "lexicache.db".to_string(),
            default_ttl: 3600,
            sweep_interval: 300,
            default_model: "gemini-2.0-flash".to_string(),
        }
    }
}
