//! Request and Response models for the extraction API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies, and the
//! metadata payload the cache stores.

pub mod metadata;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use metadata::ExtractedMetadata;
pub use requests::{validate_url, BatchRequest, ExtractQuery, InvalidateQuery, MAX_BATCH_URLS};
pub use responses::{
    BatchItem, BatchResponse, ExtractResponse, HealthResponse, InvalidateResponse, ServiceInfo,
    StatsResponse, TierHealth,
};
