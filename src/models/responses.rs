//! Response DTOs for the extraction API
//!
//! Defines the structure of outgoing HTTP response bodies. Error bodies are
//! rendered by [`ApiError`](crate::error::ApiError).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::CacheStats;
use crate::models::ExtractedMetadata;

// == Extract ==
/// Response body for `GET /api/v1/extract`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub success: bool,
    /// Whether the payload came from the cache
    pub cached: bool,
    pub latency_ms: u64,
    pub data: ExtractData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractData {
    pub url: String,
    pub open_graph: OpenGraph,
    pub twitter_card: TwitterCard,
    pub meta: PageMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenGraph {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TwitterCard {
    pub card: Option<String>,
    pub site: Option<String>,
    pub creator: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub favicon: Option<String>,
    pub theme_color: Option<String>,
    pub canonical: Option<String>,
}

impl ExtractResponse {
    /// Shapes `metadata` for the API. Twitter fields fall back to the
    /// OpenGraph ones.
    pub fn new(
        url: impl Into<String>,
        metadata: ExtractedMetadata,
        cached: bool,
        latency_ms: u64,
        full_response: bool,
    ) -> Self {
        let m = metadata;
        let raw = (full_response && !m.raw_meta.is_empty()).then(|| m.raw_meta.clone());

        Self {
            success: true,
            cached,
            latency_ms,
            data: ExtractData {
                url: url.into(),
                twitter_card: TwitterCard {
                    card: m.twitter_card,
                    site: m.twitter_site,
                    creator: m.twitter_creator,
                    title: m.twitter_title.or_else(|| m.title.clone()),
                    description: m.twitter_description.or_else(|| m.description.clone()),
                    image: m.twitter_image.or_else(|| m.image.clone()),
                },
                open_graph: OpenGraph {
                    title: m.title,
                    description: m.description,
                    image: m.image,
                    site_name: m.site_name,
                    kind: m.kind,
                    locale: m.locale,
                },
                meta: PageMeta {
                    favicon: m.favicon,
                    theme_color: m.theme_color,
                    canonical: m.canonical,
                },
                raw,
            },
        }
    }
}

// == Batch ==
/// Response body for `POST /api/v1/extract/batch`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub success: bool,
    pub latency_ms: u64,
    pub data: Vec<BatchItem>,
}

/// One URL of a batch; a failed URL does not fail the batch.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Ok {
        success: bool,
        url: String,
        cached: bool,
        #[serde(flatten)]
        metadata: ExtractedMetadata,
    },
    Failed {
        success: bool,
        url: String,
        error: String,
    },
}

impl BatchItem {
    /// `url` is the requested URL; the page's own `og:url` is dropped so the
    /// flattened payload does not repeat the key.
    pub fn ok(url: impl Into<String>, mut metadata: ExtractedMetadata, cached: bool) -> Self {
        metadata.url = None;
        BatchItem::Ok {
            success: true,
            url: url.into(),
            cached,
            metadata,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        BatchItem::Failed {
            success: false,
            url: url.into(),
            error: error.into(),
        }
    }
}

// == Invalidate ==
/// Response body for `DELETE /api/v1/extract/cache`
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub success: bool,
    pub message: String,
    pub url: String,
}

impl InvalidateResponse {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            success: true,
            message: format!("Cache cleared for '{}'", url),
            url,
        }
    }
}

// == Stats ==
/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub cache: CacheStats,
    /// hits / (hits + misses + unavailable)
    pub hit_rate: f64,
    /// Open windows in the local rate-limit fallback
    pub local_windows: usize,
    /// Keys the fast tier dropped for capacity
    pub fast_evictions: u64,
}

impl StatsResponse {
    pub fn new(cache: CacheStats, local_windows: usize, fast_evictions: u64) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            cache,
            local_windows,
            fast_evictions,
        }
    }
}

// == Health ==
/// Reachability of one storage tier.
#[derive(Debug, Clone, Serialize)]
pub struct TierHealth {
    pub name: &'static str,
    pub enabled: bool,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response body for `GET /health`
///
/// "ok" when the durable tier answers and the fast tier either answers or
/// is not configured, "degraded" otherwise.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub fast_tier: TierHealth,
    pub durable_tier: TierHealth,
}

impl HealthResponse {
    pub fn new(fast_tier: TierHealth, durable_tier: TierHealth) -> Self {
        let healthy = (fast_tier.healthy || !fast_tier.enabled) && durable_tier.healthy;
        let status = if healthy { "ok" } else { "degraded" };
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            fast_tier,
            durable_tier,
        }
    }
}

// == Root ==
/// Response body for `GET /`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        let endpoints = BTreeMap::from([
            ("extract", "GET /api/v1/extract?url="),
            ("batch", "POST /api/v1/extract/batch"),
            ("invalidate", "DELETE /api/v1/extract/cache?url="),
            ("health", "GET /health"),
            ("stats", "GET /stats"),
        ]);
        Self {
            name: "Ogify",
            version: env!("CARGO_PKG_VERSION"),
            description: "OpenGraph metadata extraction API",
            endpoints,
        }
    }
}
