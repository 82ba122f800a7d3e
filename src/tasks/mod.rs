//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired entries from the in-process fast tier
//! - Durable Purge: Deletes expired rows from the durable tier
//!
//! The local rate-window sweep is owned by
//! [`LocalWindowStore`](crate::ratelimit::LocalWindowStore) itself.

mod cleanup;
mod purge;

pub use cleanup::spawn_cleanup_task;
pub use purge::spawn_purge_task;
