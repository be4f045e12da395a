//! Sweep Task
//!
//! Background task that periodically purges expired entries from both
//! cache tiers, so rarely-read keys do not linger past their expiration.

use crate::cache::CacheStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Spawns a background task that purges expired entries every
/// `interval_seconds`.
///
/// The task runs until the handle is aborted or the runtime shuts down.
pub fn spawn_sweep_task(
    store: Arc<CacheStore>,
    interval_seconds: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
        info!("Sweep task started with interval of {} seconds", interval_seconds);

        loop {
            interval.tick().await;
            let removed = store.purge_expired();
            if removed > 0 {
                info!("Sweep removed {} expired entries", removed);
            } else {
                debug!("Sweep ran, no expired entries found");
            }
        }
    })
}

// == Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn sweep_task_removes_expired_entries() {
        let store = Arc::new(CacheStore::new(None, Duration::from_secs(300)));
        store.set("sweep:victim", &json!("soon gone"), Some(Duration::from_millis(100)));
        assert_eq!(store.len(), 1);

        let handle = spawn_sweep_task(store.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1300)).await;

        assert_eq!(store.len(), 0);
        assert!(store.stats().expirations >= 1);
        handle.abort();
    }

    #[tokio::test]
    async fn sweep_task_leaves_live_entries_alone() {
        let store = Arc::new(CacheStore::new(None, Duration::from_secs(300)));
        store.set("sweep:survivor", &json!("still here"), Some(Duration::from_secs(60)));

        let handle = spawn_sweep_task(store.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1300)).await;

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("sweep:survivor"), Some(json!("still here")));
        handle.abort();
    }

    #[tokio::test]
    async fn sweep_task_purges_durable_tier_too() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("sweep.db");
        let durable = crate::cache::DurableTier::open(&db_path).unwrap();
        let store = Arc::new(CacheStore::new(Some(durable), Duration::from_secs(300)));

        store.set("sweep:durable", &json!(42), Some(Duration::from_millis(100)));
        assert_eq!(store.durable_len(), Some(1));

        let handle = spawn_sweep_task(store.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1300)).await;

        assert_eq!(store.len(), 0);
        assert_eq!(store.durable_len(), Some(0));
        handle.abort();
    }
}
