//! Lexicache CLI
//!
//! Inspects and maintains a lexicache database from the command line.
//! The database location and defaults come from the same LEXICACHE_*
//! environment variables the embedding application uses, so the CLI
//! always looks at the cache the application is writing.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lexicache::{CacheStore, Config};

#[derive(Parser)]
#[command(name = "lexicache", version, about = "Inspect and maintain a lexicache database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print cache statistics as JSON
    Stats,
    /// Purge expired entries from both tiers
    Sweep,
    /// Print the live value stored under a key
    Get { key: String },
    /// Store a JSON value under a key
    Set {
        key: String,
        /// JSON document to store
        value: String,
        /// Time to live in seconds (defaults to the configured TTL)
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Delete a key from both tiers
    Del { key: String },
}

fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexicache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let store = CacheStore::open(&config);

    match cli.command {
        Command::Stats => {
            let report = json!({
                "db_path": config.db_path,
                "durable": store.is_durable(),
                "durable_rows": store.durable_len(),
                "stats": store.stats(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Sweep => {
            // Rows that expired while no process was running were already
            // evicted (and logged) when the store opened above.
            let removed = store.purge_expired();
            info!("Swept {} expired entries", removed);
            println!("{}", json!({ "removed": removed }));
        }
        Command::Get { key } => {
            let value = store
                .get(&key)
                .with_context(|| format!("no live entry for key: {}", key))?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Set { key, value, ttl } => {
            let value: serde_json::Value = serde_json::from_str(&value)
                .with_context(|| format!("value is not valid JSON: {}", value))?;
            let ttl = ttl.map(std::time::Duration::from_secs);
            store.set(&key, &value, ttl);
            println!("{}", json!({ "stored": key }));
        }
        Command::Del { key } => {
            store.delete(&key);
            println!("{}", json!({ "deleted": key }));
        }
    }

    Ok(())
}
