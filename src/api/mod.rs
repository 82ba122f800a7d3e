//! API Module
//!
//! HTTP handlers, middleware and routing for the extraction REST API.
//!
//! # Endpoints
//! - `GET /api/v1/extract?url=` - Extract metadata for a URL
//! - `POST /api/v1/extract/batch` - Extract metadata for several URLs
//! - `DELETE /api/v1/extract/cache?url=` - Drop a URL from the cache
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use middleware::{client_address, Caller};
pub use routes::create_router;
