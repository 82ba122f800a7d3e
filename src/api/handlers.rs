//! API Handlers
//!
//! HTTP request handlers for the extraction endpoints and the service
//! routes.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    Extension, Json,
};
use futures_util::future::join_all;
use tracing::debug;

use crate::api::middleware::Caller;
use crate::auth::SharedApiKeyDirectory;
use crate::cache::{CacheCoordinator, Lookup};
use crate::clock::SharedClock;
use crate::error::{ApiError, Result};
use crate::extract::{FetchError, SharedFetcher};
use crate::models::{
    validate_url, BatchItem, BatchRequest, BatchResponse, ExtractQuery, ExtractResponse,
    ExtractedMetadata, HealthResponse, InvalidateQuery, InvalidateResponse, ServiceInfo,
    StatsResponse, TierHealth,
};
use crate::ratelimit::{RateLimiter, RatePolicy};
use crate::usage::{SharedUsageSink, UsageEvent};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheCoordinator>,
    pub limiter: Arc<RateLimiter>,
    pub policy: RatePolicy,
    pub keys: SharedApiKeyDirectory,
    pub usage: SharedUsageSink,
    pub fetcher: SharedFetcher,
    pub clock: SharedClock,
}

/// Where a payload came from.
struct Resolved {
    metadata: ExtractedMetadata,
    cached: bool,
}

impl AppState {
    /// Reads `url` through the cache, fetching and caching it on a miss.
    ///
    /// A cache that cannot be consulted is treated like a miss; the only
    /// error is the fetch's own.
    async fn resolve(&self, url: &str, use_cache: bool) -> std::result::Result<Resolved, FetchError> {
        if use_cache {
            match self.cache.lookup::<ExtractedMetadata>(url).await {
                Lookup::Hit(metadata) => {
                    return Ok(Resolved {
                        metadata,
                        cached: true,
                    })
                }
                Lookup::Miss => {}
                Lookup::Unavailable => debug!(url, "cache unavailable, fetching from origin"),
            }
        }

        let metadata = self.fetcher.fetch_and_parse(url).await?;
        if use_cache {
            self.cache.set(url, &metadata).await;
        }
        Ok(Resolved {
            metadata,
            cached: false,
        })
    }

    async fn log_usage(&self, caller: &Caller, url: Option<&str>, status: StatusCode, started: Instant, cached: bool) {
        let Some(record) = caller.record.as_ref() else {
            return;
        };
        self.usage
            .record(UsageEvent {
                user_id: record.user_id.clone(),
                api_key_id: record.id.clone(),
                endpoint: "extract".to_string(),
                url: url.map(str::to_string),
                status: status.as_u16(),
                latency_ms: started.elapsed().as_millis() as u64,
                cached,
                user_agent: caller.user_agent.clone(),
                ip: Some(caller.address.clone()),
            })
            .await;
    }
}

/// Handler for GET /api/v1/extract
///
/// Returns the page's metadata, from the cache when possible. The response
/// says whether it was served from the cache.
pub async fn extract_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: std::result::Result<Query<ExtractQuery>, QueryRejection>,
) -> Result<Json<ExtractResponse>> {
    let started = Instant::now();

    let Query(query) = query.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let url = query.validate().map_err(ApiError::InvalidRequest)?;

    match state.resolve(&url, query.cache).await {
        Ok(resolved) => {
            state
                .log_usage(&caller, Some(&url), StatusCode::OK, started, resolved.cached)
                .await;
            let latency_ms = started.elapsed().as_millis() as u64;
            Ok(Json(ExtractResponse::new(
                url,
                resolved.metadata,
                resolved.cached,
                latency_ms,
                query.full_response,
            )))
        }
        Err(e) => {
            let err = ApiError::from(e);
            state
                .log_usage(&caller, Some(&url), err.status(), started, false)
                .await;
            Err(err)
        }
    }
}

/// Handler for POST /api/v1/extract/batch
///
/// Resolves up to ten URLs concurrently; one URL failing does not fail the
/// batch.
pub async fn batch_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: std::result::Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>> {
    let started = Instant::now();

    let Json(req) = body.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let results = join_all(req.urls.iter().map(|url| state.resolve(url, true))).await;
    let data: Vec<BatchItem> = req
        .urls
        .iter()
        .zip(results)
        .map(|(url, result)| match result {
            Ok(resolved) => BatchItem::ok(url, resolved.metadata, resolved.cached),
            Err(e) => BatchItem::failed(url, e.to_string()),
        })
        .collect();

    state
        .log_usage(&caller, None, StatusCode::OK, started, false)
        .await;

    Ok(Json(BatchResponse {
        success: true,
        latency_ms: started.elapsed().as_millis() as u64,
        data,
    }))
}

/// Handler for DELETE /api/v1/extract/cache
///
/// Drops the cached metadata for a URL from both tiers. Needs an API key.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: std::result::Result<Query<InvalidateQuery>, QueryRejection>,
) -> Result<Json<InvalidateResponse>> {
    if caller.record.is_none() {
        return Err(ApiError::Unauthorized("API key required".to_string()));
    }
    let Query(query) = query.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let url = query
        .url
        .ok_or_else(|| ApiError::InvalidRequest("url parameter is required".to_string()))?;
    validate_url(&url).map_err(ApiError::InvalidRequest)?;

    state.cache.invalidate(&url).await;
    Ok(Json(InvalidateResponse::new(url)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.cache.stats(),
        state.limiter.local().len(),
        state.cache.fast().evictions(),
    ))
}

/// Handler for GET /health
///
/// Pings both tiers. A disabled fast tier is reported, not counted as
/// unhealthy.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let fast = state.cache.fast();
    let fast_tier = if fast.is_enabled() {
        let ping = fast.ping().await;
        TierHealth {
            name: fast.name(),
            enabled: true,
            healthy: ping.is_ok(),
            error: ping.err().map(|e| e.to_string()),
        }
    } else {
        TierHealth {
            name: fast.name(),
            enabled: false,
            healthy: false,
            error: None,
        }
    };

    let ping = state.cache.durable().ping().await;
    let durable_tier = TierHealth {
        name: "sqlite",
        enabled: true,
        healthy: ping.is_ok(),
        error: ping.err().map(|e| e.to_string()),
    };

    Json(HealthResponse::new(fast_tier, durable_tier))
}

/// Handler for GET /
pub async fn root_handler() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}
