//! Read-through query cache with write-through invalidation.
//!
//! Responses to list queries are memoized in the shared store under a
//! deterministic fingerprint of the query parameters. Any write to a
//! resource namespace drops the whole namespace: coarse, but it means a
//! post-write read can never see pre-write data once the invalidation has
//! landed. The cache is an accelerant, never a dependency - every store
//! failure degrades to a pass-through.
//!
//! Concurrent misses for the same key are not deduplicated (no
//! single-flight): each one re-queries upstream and re-populates with an
//! idempotent value, so the race is harmless.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::kv::{KeyValueStore, KvError};

pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Outcome of a cache lookup. `Miss` and `Unavailable` are distinct so the
/// gateway never conflates "not cached" with "cache down", and neither is
/// ever confused with an empty result set from the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Hit(String),
    Miss,
    Unavailable,
}

#[derive(Clone)]
pub struct CacheLayer {
    kv: Arc<dyn KeyValueStore>,
    ttl_secs: u64,
}

// The canonical string uses `=` and `&` as structure; occurrences inside a
// key or value are escaped so the encoding stays lossless.
fn escape_component(raw: &str) -> String {
    raw.replace('%', "%25").replace('=', "%3D").replace('&', "%26")
}

/// Canonical fingerprint of a query-parameter set. Pairs are sorted before
/// hashing, so set-equal parameter lists produce the same fingerprint no
/// matter the order they were collected in, and delimiter characters in
/// values cannot masquerade as pair boundaries.
pub fn fingerprint(params: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = params.iter().collect();
    pairs.sort();
    let canonical = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", escape_component(k), escape_component(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{:016x}", seahash::hash(canonical.as_bytes()))
}

fn cache_key(namespace: &str, params: &[(String, String)]) -> String {
    format!("cache:{}:{}", namespace, fingerprint(params))
}

impl CacheLayer {
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl_secs: u64) -> Self {
        Self { kv, ttl_secs }
    }

    pub async fn lookup(&self, namespace: &str, params: &[(String, String)]) -> Lookup {
        let key = cache_key(namespace, params);
        match self.kv.get(&key).await {
            Ok(Some(body)) => {
                debug!(%key, "cache hit");
                Lookup::Hit(body)
            }
            Ok(None) => Lookup::Miss,
            Err(KvError::Unavailable(reason)) => {
                warn!(%key, %reason, "cache lookup degraded to miss");
                Lookup::Unavailable
            }
        }
    }

    /// Memoize a successful upstream response. Best-effort: an unavailable
    /// store is logged and reported, never propagated.
    pub async fn store(&self, namespace: &str, params: &[(String, String)], body: &str) -> bool {
        let key = cache_key(namespace, params);
        match self.kv.set_with_ttl(&key, body, self.ttl_secs).await {
            Ok(()) => true,
            Err(KvError::Unavailable(reason)) => {
                warn!(%key, %reason, "cache populate skipped");
                false
            }
        }
    }

    /// Drop every cached entry under the namespace. Returns how many were
    /// removed, or `None` when the store was unavailable.
    pub async fn invalidate(&self, namespace: &str) -> Option<u64> {
        let pattern = format!("cache:{namespace}:*");
        match self.kv.delete_by_pattern(&pattern).await {
            Ok(count) => {
                debug!(%namespace, count, "cache invalidated");
                Some(count)
            }
            Err(KvError::Unavailable(reason)) => {
                warn!(%namespace, %reason, "cache invalidation skipped");
                None
            }
        }
    }
}
