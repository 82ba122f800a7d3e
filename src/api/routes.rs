//! API Routes
//!
//! Configures the Axum router with the extraction and service endpoints.

use axum::{
    http::HeaderName,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    batch_handler, extract_handler, health_handler, invalidate_handler, root_handler,
    stats_handler, AppState,
};
use super::middleware::{authenticate, rate_limit};
use crate::ratelimit::{HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /` - Service info
/// - `GET /health` - Tier health
/// - `GET /stats` - Cache statistics
/// - `GET /api/v1/extract?url=` - Extract metadata for a URL
/// - `POST /api/v1/extract/batch` - Extract metadata for up to ten URLs
/// - `DELETE /api/v1/extract/cache?url=` - Drop a URL from the cache
///
/// # Middleware
/// - Auth, then rate limiting, on the `/api/v1/extract` routes
/// - CORS: Allows any origin and exposes the rate-limit headers
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(HEADER_LIMIT),
            HeaderName::from_static(HEADER_REMAINING),
            HeaderName::from_static(HEADER_RESET),
        ]);

    // Layers wrap outside-in: the last one added runs first
    let extract_routes = Router::new()
        .route("/api/v1/extract", get(extract_handler))
        .route("/api/v1/extract/batch", post(batch_handler))
        .route("/api/v1/extract/cache", delete(invalidate_handler))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .merge(extract_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::extract::{FetchError, MetadataFetcher};
    use crate::models::ExtractedMetadata;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    struct TitleFetcher;

    #[async_trait]
    impl MetadataFetcher for TitleFetcher {
        async fn fetch_and_parse(&self, url: &str) -> Result<ExtractedMetadata, FetchError> {
            Ok(ExtractedMetadata {
                title: Some(format!("Title of {url}")),
                ..Default::default()
            })
        }
    }

    async fn create_test_app() -> Router {
        let config = Config {
            redis_url: Some(crate::app::MEMORY_URL.to_string()),
            ..Config::default()
        };
        let services = crate::app::bootstrap_with(
            &config,
            Arc::new(TitleFetcher),
            crate::clock::SystemClock::shared(),
        )
        .await
        .unwrap();
        create_router(services.state)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint_has_no_rate_limit_headers() {
        let app = create_test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-ratelimit-limit").is_none());
    }

    #[tokio::test]
    async fn test_extract_endpoint_sets_rate_limit_headers() {
        let app = create_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/extract?url=https://a.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "10");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "9");
    }

    #[tokio::test]
    async fn test_extract_missing_url_is_bad_request() {
        let app = create_test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/api/v1/extract").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_not_found() {
        let app = create_test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/get/nonexistent").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
