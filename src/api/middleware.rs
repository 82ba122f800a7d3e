//! API Middleware
//!
//! Authentication and rate limiting for the extraction routes. Auth runs
//! first and leaves a [`Caller`] in the request extensions; the rate
//! limiter counts the request against the caller's identity before any
//! handler work happens.

use std::collections::HashMap;

use axum::{
    extract::{Query, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::api::AppState;
use crate::auth::{ApiKeyRecord, API_KEY_HEADER, API_KEY_QUERY};
use crate::error::ApiError;

/// Address used when no proxy header names the client
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// Who made the request.
#[derive(Debug, Clone)]
pub struct Caller {
    /// The validated key, None for anonymous requests
    pub record: Option<ApiKeyRecord>,
    pub address: String,
    pub user_agent: Option<String>,
}

impl Caller {
    pub fn anonymous(headers: &HeaderMap) -> Self {
        Self {
            record: None,
            address: client_address(headers),
            user_agent: header_str(headers, "user-agent").map(str::to_string),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Client address from proxy headers: the first `X-Forwarded-For` hop, then
/// `X-Real-IP`, else [`UNKNOWN_ADDRESS`].
pub fn client_address(headers: &HeaderMap) -> String {
    // X-Forwarded-For can contain multiple hops, take the first one
    if let Some(forwarded_for) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = forwarded_for.split(',').map(str::trim).find(|hop| !hop.is_empty()) {
            return first.to_string();
        }
    }

    if let Some(real_ip) = header_str(headers, "x-real-ip") {
        return real_ip.to_string();
    }

    UNKNOWN_ADDRESS.to_string()
}

/// API key from the `X-API-Key` header, else the `api_key` query parameter.
fn presented_key(request: &Request) -> Option<String> {
    if let Some(key) = header_str(request.headers(), API_KEY_HEADER) {
        return Some(key.to_string());
    }
    Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove(API_KEY_QUERY))
        .filter(|key| !key.is_empty())
}

/// Authentication middleware.
///
/// No key: the request continues as anonymous. A key that is unknown,
/// inactive or expired is refused with 401; a key without extraction
/// permission with 403.
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let mut caller = Caller::anonymous(request.headers());

    if let Some(key) = presented_key(&request) {
        let record = match state.keys.find_by_key(&key).await {
            Ok(Some(record)) => record,
            Ok(None) => return ApiError::Unauthorized("Invalid API key".to_string()).into_response(),
            Err(e) => {
                warn!(error = %e, "API key lookup failed");
                return ApiError::Internal("Failed to validate API key".to_string()).into_response();
            }
        };

        if let Err(e) = record.authorize(state.clock.now_ms()) {
            return e.into_response();
        }
        caller.record = Some(record);
    }

    request.extensions_mut().insert(caller);
    next.run(request).await
}

/// Rate limiting middleware.
///
/// Counts the request against the key's window, or the address's window
/// for anonymous callers. Every response carries the `X-RateLimit-*`
/// headers; a denied request gets 429 with `Retry-After` and never reaches
/// the handler.
pub async fn rate_limit(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let caller = match request.extensions().get::<Caller>() {
        Some(caller) => caller.clone(),
        None => {
            let caller = Caller::anonymous(request.headers());
            request.extensions_mut().insert(caller.clone());
            caller
        }
    };

    let (identity, config) = state.policy.resolve(caller.record.as_ref(), &caller.address);
    let decision = state.limiter.check(&identity, &config).await;

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        let mut response = ApiError::RateLimited {
            retry_after: decision.retry_after,
        }
        .into_response();
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(decision.retry_after));
        response
    };

    decision.apply_headers(response.headers_mut());
    response
}
