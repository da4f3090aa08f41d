//! In-process implementation of [`KeyValueStore`] with real TTL semantics
//! (for testing and single-process deployments without redis).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{KeyValueStore, KvError, Result};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Pattern support is deliberately limited to a prefix glob, mirroring the
// namespace-prefixed key space contract.
fn prefix_of(pattern: &str) -> &str {
    pattern.strip_suffix('*').unwrap_or(pattern)
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().expect("kv mutex poisoned");
        if let Some(entry) = entries.get(key) {
            if !entry.is_expired() {
                return Ok(Some(entry.value.clone()));
            }
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut entries = self.entries.lock().expect("kv mutex poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64> {
        let prefix = prefix_of(pattern);
        let mut entries = self.entries.lock().expect("kv mutex poisoned");
        let mut deleted = 0u64;
        entries.retain(|k, entry| {
            if !k.starts_with(prefix) {
                return true;
            }
            // Entries past their TTL were already dead; dropping them is
            // not an invalidation.
            if !entry.is_expired() {
                deleted += 1;
            }
            false
        });
        Ok(deleted)
    }

    async fn incr_with_ttl(&self, key: &str, ttl_secs: u64) -> Result<u64> {
        let mut entries = self.entries.lock().expect("kv mutex poisoned");
        if let Some(entry) = entries.get_mut(key) {
            if !entry.is_expired() {
                let count = entry
                    .value
                    .parse::<u64>()
                    .map_err(|e| KvError::Unavailable(format!("corrupt counter: {e}")))?
                    + 1;
                entry.value = count.to_string();
                // TTL is not refreshed here: the window end is fixed by the
                // first increment.
                return Ok(count);
            }
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: "1".to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
        Ok(1)
    }
}
