//! Cache Sweep Task
//!
//! Background task that periodically deletes expired cache files.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

/// Spawns a background task that periodically purges expired cache entries.
///
/// Reads never depend on this task: expired entries are already treated as
/// absent. The sweep only reclaims disk space.
///
/// # Arguments
/// * `cache` - Shared cache store
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task; abort it when the session ends.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(CacheStore::new("cache", true));
/// let sweeper = spawn_cleanup_task(cache.clone(), 600);
/// // Later, on exit:
/// sweeper.abort();
/// ```
pub fn spawn_cleanup_task(cache: Arc<CacheStore>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            if !cache.is_enabled() {
                continue;
            }

            // Directory scan is blocking file I/O
            let store = Arc::clone(&cache);
            match tokio::task::spawn_blocking(move || store.purge_expired()).await {
                Ok(0) => debug!("Cache sweep: no expired entries found"),
                Ok(removed) => info!("Cache sweep: removed {} expired entries", removed),
                Err(e) => warn!("Cache sweep failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEntry, CacheType, QueryParams};
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(CacheStore::new(dir.path(), true));
        let key =
            CacheStore::key_for("https://example.test", &QueryParams::new(), CacheType::Weather);

        // Written two hours ago with a one hour TTL
        cache.put_entry(&CacheEntry::stored_at(
            key.as_str(),
            json!({"stale": true}),
            3600,
            Utc::now() - chrono::Duration::hours(2),
        ));
        assert_eq!(cache.len(), 1);

        let handle = spawn_cleanup_task(cache.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.len(), 0, "Expired entry should have been swept");
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(CacheStore::new(dir.path(), true));
        let key = CacheStore::key_for(
            "https://example.test",
            &QueryParams::new(),
            CacheType::Historical,
        );
        cache.put(&key, &json!({"fresh": true}), 3600);

        let handle = spawn_cleanup_task(cache.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.get(&key), Some(json!({"fresh": true})));
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let cache = Arc::new(CacheStore::disabled());

        let handle = spawn_cleanup_task(cache, 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
