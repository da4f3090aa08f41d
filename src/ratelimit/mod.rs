//! Distributed fixed-window rate limiter.
//!
//! One counter per client identity per window, kept in the shared store so
//! every process replica enforces the same budget. The counter is created
//! lazily by the first increment, which also pins the window TTL; it
//! expires on its own at window end.

use std::sync::Arc;

use tracing::warn;

use crate::kv::{KeyValueStore, KvError};

pub mod middleware;

pub const DEFAULT_WINDOW_SECS: u64 = 60;
pub const DEFAULT_MAX_REQUESTS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected { retry_after_secs: u64 },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    kv: Arc<dyn KeyValueStore>,
    window_secs: u64,
    max_requests: u64,
}

impl RateLimiter {
    pub fn new(kv: Arc<dyn KeyValueStore>, window_secs: u64, max_requests: u64) -> Self {
        Self {
            kv,
            window_secs,
            max_requests,
        }
    }

    /// Count this request against the identity's window and decide.
    ///
    /// The increment happens unconditionally, before any other processing
    /// of the request. When the shared store is unavailable the policy is
    /// fail-open: availability of the protected service wins over strict
    /// enforcement, and the degradation is logged rather than surfaced.
    pub async fn admit(&self, identity: &str) -> Admission {
        let key = format!("ratelimit:{identity}");
        match self.kv.incr_with_ttl(&key, self.window_secs).await {
            Ok(count) if count <= self.max_requests => Admission::Admitted,
            Ok(count) => {
                warn!(%identity, count, limit = self.max_requests, "rate limit exceeded");
                Admission::Rejected {
                    retry_after_secs: self.window_secs,
                }
            }
            Err(KvError::Unavailable(reason)) => {
                warn!(%identity, %reason, "rate limiter unavailable, failing open");
                Admission::Admitted
            }
        }
    }
}
