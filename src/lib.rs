pub mod api;
pub mod cache;
pub mod config;
pub mod gateway;
pub mod kv;
pub mod model;
pub mod ratelimit;
pub mod store;

pub use cache::CacheLayer;
pub use gateway::QueryGateway;
pub use ratelimit::RateLimiter;
