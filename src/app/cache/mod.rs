//! Key/value cache shared by the refresh engine and the read endpoint
//!
//! The refresh engine is the only writer and the read endpoint the only
//! reader of weather snapshots; the store is the sole coupling point between
//! the two paths.
//!
//! # Module Organization
//!
//! - [`config`] - Connection pool settings
//! - [`keys`] - Cache key derivation
//! - [`redis_store`] - Production Redis backend behind a bounded pool
//! - [`memory`] - In-process TTL store for tests and demo runs
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use weather_cache::app::cache::{keys, CacheStore, MemoryCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = MemoryCache::new();
//! cache
//!     .set_with_ttl(&keys::weather_key("stgo"), r#"{"temp":20}"#, Duration::from_secs(600))
//!     .await?;
//! assert!(cache.get("weather_stgo").await?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod keys;
pub mod memory;
pub mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::CacheResult;

pub use config::CacheConfig;
pub use memory::MemoryCache;
pub use redis_store::RedisCache;

/// String key/value store with per-write expiry
///
/// Implementations must be safe for concurrent use by every location task of
/// a refresh cycle and by request handlers at the same time.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a value; `None` when the key was never written or has expired
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Write a value that expires after `ttl`, replacing any previous value
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Check that the backend answers
    async fn ping(&self) -> CacheResult<()>;

    /// Release backend connections. Later calls fail with `CacheError::Closed`.
    async fn close(&self);

    /// Short backend name for logs and the health endpoint
    fn backend(&self) -> &'static str;
}
