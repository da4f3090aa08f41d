//! Shared key-value store abstraction.
//!
//! The cache layer and the rate limiter both talk to a network-accessible
//! key-value store through this trait. The store is the single source of
//! truth for cache entries and rate-window counters; no in-process copies
//! are held across requests.

use async_trait::async_trait;
use thiserror::Error;

mod memory;
mod redis_store;

pub use memory::MemoryKvStore;
pub use redis_store::RedisKvStore;

/// Any failure to reach or operate the shared store. Callers are expected
/// to fail open rather than propagate this to the client.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, KvError>;

/// Contract for the shared store.
///
/// `incr_with_ttl` must be linearizable across concurrent callers, and must
/// set the TTL only when the increment creates the key. Later increments
/// never refresh it, so the window length stays deterministic.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// Delete every key under a namespace prefix. `pattern` ends with `*`;
    /// anything more exotic than a prefix glob is not supported.
    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64>;

    async fn incr_with_ttl(&self, key: &str, ttl_secs: u64) -> Result<u64>;
}
