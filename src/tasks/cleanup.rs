//! TTL Cleanup Task
//!
//! Background task that periodically removes expired entries from the
//! in-process fast tier. Redis expires keys on its own and needs no sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryFastStore;

/// Spawns a background task that periodically cleans up expired entries.
///
/// The task runs until aborted, sleeping for `interval` between runs.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let store = Arc::new(MemoryFastStore::new(1000, SystemClock::shared()));
/// let cleanup_handle = spawn_cleanup_task(store.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(store: Arc<MemoryFastStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting TTL cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.cleanup_expired().await;
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FastStore;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let clock = ManualClock::starting_now();
        let store = Arc::new(MemoryFastStore::new(100, clock.clone()));
        store
            .set_px("expire_soon", "value".into(), Duration::from_secs(1))
            .await
            .unwrap();
        store
            .set_px("long_lived", "value".into(), Duration::from_secs(3600))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(2));

        let handle = spawn_cleanup_task(store.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.abort();

        assert_eq!(store.len().await, 1, "only the live entry should remain");
        assert_eq!(store.get("long_lived").await.unwrap().as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let store = Arc::new(MemoryFastStore::new(100, ManualClock::starting_now()));

        let handle = spawn_cleanup_task(store, Duration::from_secs(1));
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
