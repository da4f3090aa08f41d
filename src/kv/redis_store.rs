//! Redis-backed implementation of [`KeyValueStore`].

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{error, info};

use super::{KeyValueStore, KvError, Result};

/// Shared-store handle built on a redis connection manager.
///
/// If the connection cannot be established at startup the store comes up
/// disabled: every operation reports `Unavailable` and the layers above
/// degrade to pass-through. The process never refuses to start because
/// redis is down.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: Option<ConnectionManager>,
}

impl RedisKvStore {
    pub async fn connect(redis_url: &str) -> Self {
        match redis::Client::open(redis_url) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(conn) => {
                    info!(url = %redis_url, "connected to redis");
                    Self { conn: Some(conn) }
                }
                Err(e) => {
                    error!(error = %e, "redis connection failed, store disabled");
                    Self::disabled()
                }
            },
            Err(e) => {
                error!(error = %e, "invalid redis url, store disabled");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { conn: None }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn conn(&self) -> Result<ConnectionManager> {
        self.conn
            .clone()
            .ok_or_else(|| KvError::Unavailable("not connected".into()))
    }
}

fn unavailable(e: redis::RedisError) -> KvError {
    KvError::Unavailable(e.to_string())
}

#[async_trait]
impl KeyValueStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn()?;
        conn.get(key).await.map_err(unavailable)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn()?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(unavailable)
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.conn()?;
        let keys: Vec<String> = conn.keys(pattern).await.map_err(unavailable)?;
        let count = keys.len() as u64;
        if !keys.is_empty() {
            conn.del::<_, ()>(keys).await.map_err(unavailable)?;
        }
        Ok(count)
    }

    async fn incr_with_ttl(&self, key: &str, ttl_secs: u64) -> Result<u64> {
        let mut conn = self.conn()?;
        let count: u64 = conn.incr(key, 1u64).await.map_err(unavailable)?;
        // INCR created the key: pin the window length. Subsequent calls
        // leave the TTL untouched.
        if count == 1 {
            conn.expire::<_, ()>(key, ttl_secs as i64)
                .await
                .map_err(unavailable)?;
        }
        Ok(count)
    }
}
