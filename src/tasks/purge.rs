//! Durable Purge Task
//!
//! Deletes expired rows from the durable tier on a fixed interval. Reads
//! already ignore expired rows; this only reclaims space.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheCoordinator;

/// Spawns the purge loop. Abort the handle to stop it.
pub fn spawn_purge_task(cache: Arc<CacheCoordinator>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting durable purge task");

        loop {
            tokio::time::sleep(interval).await;

            match cache.purge_expired().await {
                Ok(0) => debug!("Durable purge: no expired rows found"),
                Ok(removed) => info!("Durable purge: removed {} expired rows", removed),
                Err(e) => warn!(error = %e, "Durable purge failed"),
            }
        }
    })
}
