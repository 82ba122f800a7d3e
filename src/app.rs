//! Application Wiring
//!
//! Builds the storage tiers, the coordinators and the request-layer
//! collaborators from a [`Config`]. The fast tier is optional: no URL, or a
//! Redis URL that cannot be used, leaves the service running on the durable
//! tier and the local rate windows.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::api::AppState;
use crate::auth::SqliteApiKeyDirectory;
use crate::cache::{
    CacheCoordinator, DisabledFastStore, MemoryFastStore, RedisFastStore, SharedFastStore,
    SqliteDurableStore,
};
use crate::clock::{SharedClock, SystemClock};
use crate::config::Config;
use crate::extract::{FetchError, HttpFetcher, SharedFetcher};
use crate::ratelimit::{LocalWindowStore, RateLimiter};
use crate::usage::SqliteUsageLog;

/// `REDIS_URL` value selecting the in-process fast tier
pub const MEMORY_URL: &str = "memory://";

const REDIS_CONNECT_WAIT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("http client: {0}")]
    HttpClient(#[from] FetchError),
}

/// Everything the server needs, plus handles for the background tasks.
pub struct Services {
    pub state: AppState,
    /// Set when the in-process fast tier is in use; it needs a TTL sweep
    pub memory: Option<Arc<MemoryFastStore>>,
    pub local: Arc<LocalWindowStore>,
    pub keys: Arc<SqliteApiKeyDirectory>,
}

/// Builds the services with the wall clock and the HTTP fetcher.
pub async fn bootstrap(config: &Config) -> Result<Services, StartupError> {
    let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout())?);
    bootstrap_with(config, fetcher, SystemClock::shared()).await
}

/// Builds the services around the given fetcher and clock.
pub async fn bootstrap_with(
    config: &Config,
    fetcher: SharedFetcher,
    clock: SharedClock,
) -> Result<Services, StartupError> {
    let pool = crate::db::connect(&config.database_url).await?;
    crate::db::migrate(&pool).await?;
    info!(url = %config.database_url, "Durable tier ready");

    let (fast, memory) = select_fast_store(config, clock.clone()).await;

    let cache = Arc::new(CacheCoordinator::new(
        fast.clone(),
        Arc::new(SqliteDurableStore::new(pool.clone())),
        config.cache_ttl(),
        clock.clone(),
    ));

    let local = Arc::new(LocalWindowStore::new(clock.clone()));
    let limiter = Arc::new(RateLimiter::new(fast, local.clone(), clock.clone()));
    let keys = Arc::new(SqliteApiKeyDirectory::new(pool.clone()));
    let usage = Arc::new(SqliteUsageLog::new(pool, clock.clone()));

    let state = AppState {
        cache,
        limiter,
        policy: config.rate_policy(),
        keys: keys.clone(),
        usage,
        fetcher,
        clock,
    };

    Ok(Services {
        state,
        memory,
        local,
        keys,
    })
}

/// Picks the fast tier for `REDIS_URL`.
async fn select_fast_store(
    config: &Config,
    clock: SharedClock,
) -> (SharedFastStore, Option<Arc<MemoryFastStore>>) {
    match config.redis_url.as_deref() {
        None => {
            info!("REDIS_URL not set, fast tier disabled");
            (DisabledFastStore::shared(), None)
        }
        Some(MEMORY_URL) => {
            let store = Arc::new(MemoryFastStore::new(config.memory_cache_max_entries, clock));
            info!(max_entries = config.memory_cache_max_entries, "In-process fast tier enabled");
            (store.clone() as SharedFastStore, Some(store))
        }
        Some(url) => {
            match RedisFastStore::connect(url, config.store_timeout(), REDIS_CONNECT_WAIT).await {
                Ok(store) => (Arc::new(store) as SharedFastStore, None),
                Err(e) => {
                    warn!(error = %e, "Redis fast tier unusable, running without it");
                    (DisabledFastStore::shared(), None)
                }
            }
        }
    }
}
