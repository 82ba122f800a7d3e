//! Request DTOs for the extraction API
//!
//! Defines the query strings and bodies accepted by the `/api/v1/extract`
//! routes.

use reqwest::Url;
use serde::{Deserialize, Deserializer};

/// Maximum URLs accepted by one batch request
pub const MAX_BATCH_URLS: usize = 10;

/// Query of `GET /api/v1/extract`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractQuery {
    #[serde(default)]
    pub url: Option<String>,
    /// Read and write the cache (default: true)
    #[serde(default = "default_true", deserialize_with = "loose_bool")]
    pub cache: bool,
    /// Include the raw meta map (default: false)
    #[serde(default, deserialize_with = "loose_bool")]
    pub full_response: bool,
}

impl ExtractQuery {
    /// Returns the validated target URL.
    pub fn validate(&self) -> Result<String, String> {
        match self.url.as_deref() {
            None | Some("") => Err("url parameter is required".to_string()),
            Some(url) => validate_url(url).map(str::to_string),
        }
    }
}

/// Query of `DELETE /api/v1/extract/cache`
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateQuery {
    #[serde(default)]
    pub url: Option<String>,
}

/// Body of `POST /api/v1/extract/batch`
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub urls: Vec<String>,
}

impl BatchRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.urls.is_empty() {
            return Some("urls must not be empty".to_string());
        }
        if self.urls.len() > MAX_BATCH_URLS {
            return Some(format!("at most {MAX_BATCH_URLS} urls per batch"));
        }
        self.urls.iter().find_map(|url| validate_url(url).err())
    }
}

/// Accepts absolute http(s) URLs with a host.
pub fn validate_url(url: &str) -> Result<&str, String> {
    let invalid = || format!("Invalid URL format: {url}");
    let parsed = Url::parse(url).map_err(|_| invalid())?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }
    Ok(url)
}

fn default_true() -> bool {
    true
}

/// Query flags arrive as strings; anything but false/0/empty counts as set.
fn loose_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(!matches!(raw.trim().to_ascii_lowercase().as_str(), "false" | "0" | ""))
}
