//! Process configuration, read once at startup from the environment.

use crate::cache::DEFAULT_CACHE_TTL_SECS;
use crate::ratelimit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECS};

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub redis_url: String,
    pub database_path: String,
    pub admin_token: String,
    pub cache_ttl_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_requests: u64,
    pub trust_proxy: bool,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "127.0.0.1"),
            port: env_parse("PORT", 5000),
            redis_url: env_or("REDIS_URL", "redis://localhost:6379"),
            database_path: env_or("DATABASE_PATH", "chapters.db"),
            admin_token: env_or("ADMIN_TOKEN", ""),
            cache_ttl_secs: env_parse("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
            rate_limit_window_secs: env_parse("RATE_LIMIT_WINDOW_SECS", DEFAULT_WINDOW_SECS),
            rate_limit_max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS", DEFAULT_MAX_REQUESTS),
            trust_proxy: env_parse("TRUST_PROXY", false),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            redis_url: "redis://localhost:6379".to_string(),
            database_path: "chapters.db".to_string(),
            admin_token: String::new(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            rate_limit_window_secs: DEFAULT_WINDOW_SECS,
            rate_limit_max_requests: DEFAULT_MAX_REQUESTS,
            trust_proxy: false,
        }
    }
}
