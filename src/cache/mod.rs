//! Cache Module
//!
//! Two-tier metadata cache: a fast tier (Redis or in-process) in front of a
//! durable SQLite tier, coordinated by [`CacheCoordinator`].

mod coordinator;
mod durable;
mod entry;
mod fast;
mod hasher;
mod lookup;
mod lru;
mod memory;
mod redis;
mod stats;

#[cfg(test)]
pub(crate) mod testing;


// Re-export public types
pub use coordinator::CacheCoordinator;
pub use durable::{DurableStore, SharedDurableStore, SqliteDurableStore};
pub use entry::CacheEntry;
pub use fast::{DisabledFastStore, FastStore, SharedFastStore};
pub use hasher::{hash_subject, HASH_WIDTH};
pub use lookup::Lookup;
pub use memory::MemoryFastStore;
pub use redis::RedisFastStore;
pub use stats::{CacheCounters, CacheStats};

// == Public Constants ==
/// Fast-tier key prefix for cached metadata
pub const CACHE_PREFIX: &str = "ogify:meta:";
