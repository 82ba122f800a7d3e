//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint, with a stub origin
//! in place of the HTTP fetcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use ogify::{
    app::MEMORY_URL,
    auth::ApiKeyRecord,
    bootstrap_with,
    clock::SystemClock,
    create_router,
    extract::{FetchError, MetadataFetcher},
    models::ExtractedMetadata,
    Config, Services,
};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

/// Origin stub: URLs containing "fail" answer 404, everything else a page
/// titled after its URL.
#[derive(Default)]
struct StubFetcher {
    calls: AtomicUsize,
}

impl StubFetcher {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataFetcher for StubFetcher {
    async fn fetch_and_parse(&self, url: &str) -> Result<ExtractedMetadata, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("fail") {
            return Err(FetchError::Status(404));
        }
        Ok(ExtractedMetadata {
            title: Some(format!("Title of {url}")),
            description: Some("A page".to_string()),
            image: Some("https://cdn.test/card.png".to_string()),
            url: Some(url.to_string()),
            ..Default::default()
        })
    }
}

struct TestApp {
    router: Router,
    fetcher: Arc<StubFetcher>,
    keys: Arc<ogify::auth::SqliteApiKeyDirectory>,
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn insert_key(&self, record: ApiKeyRecord) {
        self.keys.insert(&record).await.unwrap();
    }
}

async fn create_test_app_with(redis_url: Option<&str>) -> TestApp {
    let config = Config {
        redis_url: redis_url.map(str::to_string),
        ..Config::default()
    };
    let fetcher = Arc::new(StubFetcher::default());
    let services: Services = bootstrap_with(&config, fetcher.clone(), SystemClock::shared())
        .await
        .unwrap();
    TestApp {
        keys: services.keys.clone(),
        router: create_router(services.state),
        fetcher,
    }
}

async fn create_test_app() -> TestApp {
    create_test_app_with(Some(MEMORY_URL)).await
}

async fn body_to_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn key_record(key: &str, rate_limit: u32) -> ApiKeyRecord {
    ApiKeyRecord {
        id: format!("id-{key}"),
        user_id: "user-1".to_string(),
        key: key.to_string(),
        rate_limit,
        daily_limit: 1000,
        can_extract: true,
        can_generate: true,
        active: true,
        expires_at: None,
    }
}

fn with_key(uri: &str, key: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-api-key", key)
        .body(Body::empty())
        .unwrap()
}

// == Extract Endpoint Tests ==

#[tokio::test]
async fn test_extract_success_shape() {
    let app = create_test_app().await;

    let response = app.get("/api/v1/extract?url=https://example.test/a").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["cached"], false);
    assert_eq!(json["data"]["url"], "https://example.test/a");
    assert_eq!(json["data"]["openGraph"]["title"], "Title of https://example.test/a");
    // Twitter fields fall back to OpenGraph
    assert_eq!(json["data"]["twitterCard"]["image"], "https://cdn.test/card.png");
    assert!(json["data"].get("raw").is_none());
}

#[tokio::test]
async fn test_extract_second_request_is_cached() {
    let app = create_test_app().await;
    let uri = "/api/v1/extract?url=https://example.test/cached";

    let first = body_to_json(app.get(uri).await).await;
    let second = body_to_json(app.get(uri).await).await;

    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], true);
    assert_eq!(second["data"]["openGraph"]["title"], first["data"]["openGraph"]["title"]);
    assert_eq!(app.fetcher.calls(), 1);
}

#[tokio::test]
async fn test_extract_cache_false_bypasses_cache() {
    let app = create_test_app().await;
    let uri = "/api/v1/extract?url=https://example.test/fresh&cache=false";

    let first = body_to_json(app.get(uri).await).await;
    let second = body_to_json(app.get(uri).await).await;

    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], false);
    assert_eq!(app.fetcher.calls(), 2);
}

#[tokio::test]
async fn test_extract_without_fast_tier_uses_durable_tier() {
    let app = create_test_app_with(None).await;
    let uri = "/api/v1/extract?url=https://example.test/durable";

    assert_eq!(body_to_json(app.get(uri).await).await["cached"], false);
    assert_eq!(body_to_json(app.get(uri).await).await["cached"], true);
    assert_eq!(app.fetcher.calls(), 1);
}

#[tokio::test]
async fn test_extract_missing_url() {
    let app = create_test_app().await;

    let response = app.get("/api/v1/extract").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_to_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "url parameter is required");
}

#[tokio::test]
async fn test_extract_invalid_url() {
    let app = create_test_app().await;

    let response = app.get("/api/v1/extract?url=ftp://example.test").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.fetcher.calls(), 0);
}

#[tokio::test]
async fn test_extract_origin_failure_is_bad_gateway() {
    let app = create_test_app().await;

    let response = app.get("/api/v1/extract?url=https://fail.test").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = body_to_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "HTTP 404");
}

// == Rate Limit Tests ==

#[tokio::test]
async fn test_anonymous_rate_limit() {
    let app = create_test_app().await;
    let uri = "/api/v1/extract?url=https://example.test/limited";

    for expected_remaining in (0..10).rev() {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "10");
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            expected_remaining.to_string().as_str()
        );
    }

    let response = app.get(uri).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert!(response.headers().contains_key("x-ratelimit-reset"));
    assert!(response.headers().contains_key("retry-after"));

    let json = body_to_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Rate limit exceeded");
    assert!(json["retryAfter"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_addresses_have_separate_windows() {
    let app = create_test_app().await;

    let from = |address: &str| {
        Request::builder()
            .uri("/api/v1/extract?url=https://example.test/ip")
            .header("x-forwarded-for", address)
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..10 {
        assert_eq!(app.send(from("203.0.113.1")).await.status(), StatusCode::OK);
    }
    assert_eq!(
        app.send(from("203.0.113.1")).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(app.send(from("203.0.113.2")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_key_uses_its_own_allowance() {
    let app = create_test_app().await;
    app.insert_key(key_record("og_small", 3)).await;
    let uri = "/api/v1/extract?url=https://example.test/keyed";

    for _ in 0..3 {
        let response = app.send(with_key(uri, "og_small")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "3");
    }
    let response = app.send(with_key(uri, "og_small")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // The anonymous window for the same address is untouched
    assert_eq!(app.get(uri).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_is_not_applied_to_service_routes() {
    let app = create_test_app().await;

    for _ in 0..15 {
        let response = app.get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-ratelimit-limit").is_none());
    }
}

// == Auth Tests ==

#[tokio::test]
async fn test_unknown_api_key() {
    let app = create_test_app().await;

    let response = app
        .send(with_key("/api/v1/extract?url=https://example.test", "og_missing"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_to_json(response).await["error"], "Invalid API key");
}

#[tokio::test]
async fn test_api_key_from_query_parameter() {
    let app = create_test_app().await;
    app.insert_key(key_record("og_query", 2)).await;

    let response = app
        .get("/api/v1/extract?url=https://example.test&api_key=og_query")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "2");
}

#[tokio::test]
async fn test_deactivated_and_expired_keys() {
    let app = create_test_app().await;
    app.insert_key(ApiKeyRecord {
        active: false,
        ..key_record("og_off", 10)
    })
    .await;
    app.insert_key(ApiKeyRecord {
        expires_at: Some(1_000),
        ..key_record("og_old", 10)
    })
    .await;
    let uri = "/api/v1/extract?url=https://example.test";

    let response = app.send(with_key(uri, "og_off")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_to_json(response).await["error"], "API key has been deactivated");

    let response = app.send(with_key(uri, "og_old")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_to_json(response).await["error"], "API key has expired");
}

#[tokio::test]
async fn test_key_without_extract_permission() {
    let app = create_test_app().await;
    app.insert_key(ApiKeyRecord {
        can_extract: false,
        ..key_record("og_gen", 10)
    })
    .await;

    let response = app
        .send(with_key("/api/v1/extract?url=https://example.test", "og_gen"))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.fetcher.calls(), 0);
}

// == Invalidate Endpoint Tests ==

#[tokio::test]
async fn test_invalidate_requires_api_key() {
    let app = create_test_app().await;

    let response = app
        .send(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/extract/cache?url=https://example.test")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_to_json(response).await["error"], "API key required");
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let app = create_test_app().await;
    app.insert_key(key_record("og_admin", 0)).await;
    let uri = "/api/v1/extract?url=https://example.test/stale";

    app.get(uri).await;
    assert_eq!(body_to_json(app.get(uri).await).await["cached"], true);

    let response = app
        .send(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/extract/cache?url=https://example.test/stale")
                .header("x-api-key", "og_admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["url"], "https://example.test/stale");

    assert_eq!(body_to_json(app.get(uri).await).await["cached"], false);
    assert_eq!(app.fetcher.calls(), 2);
}

#[tokio::test]
async fn test_invalidate_malformed_query_is_json_error() {
    let app = create_test_app().await;
    app.insert_key(key_record("og_admin", 0)).await;

    let response = app
        .send(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/extract/cache?url=https://a.test&url=https://b.test")
                .header("x-api-key", "og_admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("url"));
}

// == Batch Endpoint Tests ==

fn batch(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/extract/batch")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_batch_reports_each_url() {
    let app = create_test_app().await;

    let response = app
        .send(batch(r#"{"urls":["https://one.test","https://fail.test"]}"#))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response).await;
    assert_eq!(json["success"], true);
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);

    assert_eq!(data[0]["success"], true);
    assert_eq!(data[0]["url"], "https://one.test");
    assert_eq!(data[0]["cached"], false);
    assert_eq!(data[0]["title"], "Title of https://one.test");

    assert_eq!(data[1]["success"], false);
    assert_eq!(data[1]["url"], "https://fail.test");
    assert_eq!(data[1]["error"], "HTTP 404");
}

#[tokio::test]
async fn test_batch_too_many_urls() {
    let app = create_test_app().await;
    let urls: Vec<String> = (0..11).map(|i| format!("\"https://{i}.test\"")).collect();

    let response = app
        .send(batch(&format!(r#"{{"urls":[{}]}}"#, urls.join(","))))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.fetcher.calls(), 0);
}

#[tokio::test]
async fn test_batch_invalid_body() {
    let app = create_test_app().await;

    let response = app.send(batch(r#"{"urls": "nope"}"#)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(batch(r#"{"urls": []}"#)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Service Route Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["fastTier"]["name"], "memory");
    assert_eq!(json["fastTier"]["healthy"], true);
    assert_eq!(json["durableTier"]["healthy"], true);
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_health_with_fast_tier_disabled() {
    let app = create_test_app_with(None).await;

    let json = body_to_json(app.get("/health").await).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["fastTier"]["enabled"], false);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app().await;
    let uri = "/api/v1/extract?url=https://example.test/stats";

    app.get(uri).await;
    app.get(uri).await;

    let response = app.get("/stats").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response).await;
    assert_eq!(json["fastHits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["hitRate"], 0.5);
    assert_eq!(json["fastEvictions"], 0);
}

#[tokio::test]
async fn test_root_endpoint() {
    let app = create_test_app().await;

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response).await;
    assert_eq!(json["name"], "Ogify");
    assert!(json["endpoints"].get("extract").is_some());
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_test_app().await;

    let response = app.get("/nonexistent").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
