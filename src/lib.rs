//! Ogify - metadata extraction service
//!
//! Extracts Open Graph, Twitter Card and HTML metadata from web pages behind
//! a two-tier cache and a fixed-window rate limiter that keeps counting
//! locally when the shared store is down.

pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod ratelimit;
pub mod tasks;
pub mod usage;

pub use api::{create_router, AppState};
pub use app::{bootstrap, bootstrap_with, Services, StartupError};
pub use cache::CacheCoordinator;
pub use config::Config;
pub use ratelimit::RateLimiter;
pub use tasks::{spawn_cleanup_task, spawn_purge_task};
