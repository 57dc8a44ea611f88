//! Cache configuration types and defaults
//!
//! Host and port come from the environment (see [`crate::config::ServiceEnv`]);
//! this struct only carries the pool bounds from the settings file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::cache;
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for the Redis connection pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of pooled connections
    pub pool_max_size: usize,
    /// How long a caller waits for a free connection
    #[serde(with = "humantime_serde")]
    pub pool_wait_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            pool_max_size: cache::POOL_MAX_SIZE,
            pool_wait_timeout: cache::POOL_WAIT_TIMEOUT,
        }
    }
}

impl CacheConfig {
    /// Set the maximum pool size
    pub fn with_pool_max_size(mut self, size: usize) -> Self {
        self.pool_max_size = size;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pool_max_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.pool_max_size".to_string(),
                value: "0".to_string(),
                reason: "The pool needs at least one connection".to_string(),
            });
        }

        if self.pool_wait_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "cache.pool_wait_timeout".to_string(),
                value: "0s".to_string(),
                reason: "Wait timeout cannot be zero".to_string(),
            });
        }

        Ok(())
    }
}
