use std::sync::Arc;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use chapterd::api::{start_api_server, AppState};
use chapterd::cache::CacheLayer;
use chapterd::config::ApiConfig;
use chapterd::gateway::QueryGateway;
use chapterd::kv::{KeyValueStore, RedisKvStore};
use chapterd::ratelimit::RateLimiter;
use chapterd::store::SqliteRecordStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ApiConfig::from_env();

    let kv = RedisKvStore::connect(&config.redis_url).await;
    if !kv.is_connected() {
        warn!("redis unreachable: cache and rate limiter will run fail-open");
    }
    let kv: Arc<dyn KeyValueStore> = Arc::new(kv);

    let store = SqliteRecordStore::open(&config.database_path)
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let state = AppState {
        gateway: QueryGateway::new(
            CacheLayer::new(Arc::clone(&kv), config.cache_ttl_secs),
            Arc::new(store),
        ),
        limiter: Arc::new(RateLimiter::new(
            Arc::clone(&kv),
            config.rate_limit_window_secs,
            config.rate_limit_max_requests,
        )),
        config: config.clone(),
    };

    start_api_server(&config, state).await
}
