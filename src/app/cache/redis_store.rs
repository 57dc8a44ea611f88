//! Redis-backed cache store
//!
//! Connections come from a bounded `deadpool-redis` pool so a refresh cycle
//! with many concurrent locations cannot open unbounded sockets. Writes use
//! `SET key value EX <ttl>` and reads `GET key`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use tracing::{debug, info};

use super::config::CacheConfig;
use super::CacheStore;
use crate::errors::{CacheError, CacheResult};

/// Cache store talking to a Redis server
pub struct RedisCache {
    pool: Pool,
    url: String,
    closed: AtomicBool,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("url", &self.url)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl RedisCache {
    /// Create a pool for `host:port`. No connection is opened until first use.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::CreatePool` if the connection settings are invalid
    pub fn connect(host: &str, port: u16, config: &CacheConfig) -> CacheResult<Self> {
        let url = connection_url(host, port);

        let mut pool_config = PoolConfig::new(config.pool_max_size);
        pool_config.timeouts.wait = Some(config.pool_wait_timeout);
        pool_config.timeouts.create = Some(config.pool_wait_timeout);

        let mut redis_config = Config::from_url(url.clone());
        redis_config.pool = Some(pool_config);
        let pool = redis_config.create_pool(Some(Runtime::Tokio1))?;

        info!(
            "Created Redis pool for {} (max {} connections)",
            url, config.pool_max_size
        );

        Ok(Self {
            pool,
            url,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> CacheResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.ensure_open()?;
        let mut conn = self.pool.get().await?;
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.ensure_open()?;
        let mut conn = self.pool.get().await?;
        let () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .query_async(&mut conn)
            .await?;
        debug!("SET {} ({} bytes, ttl {:?})", key, value.len(), ttl);
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        self.ensure_open()?;
        let mut conn = self.pool.get().await?;
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.pool.close();
            info!("Closed Redis pool for {}", self.url);
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// Redis connection URL for a host and port
fn connection_url(host: &str, port: u16) -> String {
    format!("redis://{}:{}/", host, port)
}

/// `EX` takes whole seconds and rejects zero
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
