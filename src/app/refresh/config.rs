//! Configuration structures for the refresh engine
//!
//! This module defines the schedule, retry policy, entry lifetime and
//! shutdown behavior of refresh cycles.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{cache, refresh};

/// Configuration for the refresh engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Sleep between the end of one cycle and the start of the next
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Attempts per location per cycle
    pub max_attempts: u32,
    /// Linear backoff step; retry n waits `n * backoff_step`
    #[serde(with = "humantime_serde")]
    pub backoff_step: Duration,
    /// Lifetime of every entry written to the cache
    #[serde(with = "humantime_serde")]
    pub entry_ttl: Duration,
    /// Probability that an attempt fails before reaching the provider
    pub failure_rate: f64,
    /// Maximum time an in-flight cycle may keep running after shutdown
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: refresh::REFRESH_INTERVAL,
            max_attempts: refresh::MAX_ATTEMPTS,
            backoff_step: refresh::BACKOFF_STEP,
            entry_ttl: cache::ENTRY_TTL,
            failure_rate: 0.0,
            shutdown_timeout: refresh::SHUTDOWN_DRAIN_TIMEOUT,
        }
    }
}

impl RefreshConfig {
    /// Set the inter-cycle interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the backoff step
    pub fn with_backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    /// Set the attempt limit
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the injected failure probability
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate;
        self
    }

    /// Set shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.interval.is_zero() {
            return Err("Refresh interval cannot be zero".to_string());
        }

        if self.max_attempts == 0 {
            return Err("Max attempts must be at least 1".to_string());
        }

        if self.backoff_step.is_zero() {
            return Err("Backoff step cannot be zero".to_string());
        }

        if self.entry_ttl < Duration::from_secs(1) {
            return Err("Entry TTL must be at least one second".to_string());
        }

        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(format!(
                "Failure rate must be between 0.0 and 1.0, got {}",
                self.failure_rate
            ));
        }

        if self.shutdown_timeout.is_zero() {
            return Err("Shutdown timeout cannot be zero".to_string());
        }

        Ok(())
    }
}
