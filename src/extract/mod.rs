//! Extract Module
//!
//! Fetches a page and turns its head tags into [`ExtractedMetadata`].
//! Called only after a confirmed cache miss.

mod http;
mod parser;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ExtractedMetadata;

pub use http::HttpFetcher;
pub use parser::parse_html;

/// Failure to produce metadata for a URL.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The origin did not answer before the fetch timeout
    #[error("Request timeout")]
    Timeout,

    /// The origin answered with a non-success status
    #[error("HTTP {0}")]
    Status(u16),

    /// The origin answered with something other than HTML
    #[error("URL does not return HTML content")]
    NotHtml,

    /// Connection, TLS or body errors
    #[error("Failed to fetch URL: {0}")]
    Request(String),
}

#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch_and_parse(&self, url: &str) -> Result<ExtractedMetadata, FetchError>;
}

pub type SharedFetcher = Arc<dyn MetadataFetcher>;
