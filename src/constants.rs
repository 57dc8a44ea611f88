//! Application constants for the weather cache
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names read at startup
pub mod env {
    /// Host name of the Redis cache
    pub const REDIS_HOST: &str = "REDIS_HOST";

    /// Port of the Redis cache
    pub const REDIS_PORT: &str = "REDIS_PORT";

    /// Base URL of the weather provider's realtime endpoint
    pub const WEATHER_URL: &str = "WEATHER_URL";

    /// API key sent to the weather provider
    pub const API_KEY: &str = "API_KEY";

    /// Optional path to the location registry file
    pub const CITIES_FILE: &str = "CITIES_FILE";

    /// Optional listen address for the HTTP server
    pub const BIND_ADDR: &str = "BIND_ADDR";
}

/// Cache key layout and entry lifetimes
pub mod cache {
    use super::Duration;

    /// Prefix of weather snapshot keys (`weather_<alias>`)
    pub const WEATHER_KEY_PREFIX: &str = "weather_";

    /// Prefix of provider error keys (`weather_error_<display name>`)
    pub const ERROR_KEY_PREFIX: &str = "weather_error_";

    /// Lifetime of every entry the refresh engine writes
    pub const ENTRY_TTL: Duration = Duration::from_secs(600);

    /// Maximum connections held by the Redis pool
    pub const POOL_MAX_SIZE: usize = 10;

    /// How long a caller waits for a pooled connection
    pub const POOL_WAIT_TIMEOUT: Duration = Duration::from_secs(5);
}

/// Refresh schedule and retry policy
pub mod refresh {
    use super::Duration;

    /// Sleep between two refresh cycles
    pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

    /// Attempts per location per cycle
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Linear backoff step; the n-th retry waits `n * BACKOFF_STEP`
    pub const BACKOFF_STEP: Duration = Duration::from_millis(1000);

    /// Window granted to an in-flight cycle once shutdown is requested
    pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

    /// Injected failure probability used by demo deployments
    pub const DEMO_FAILURE_RATE: f64 = 0.2;
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for provider requests
    pub const USER_AGENT: &str = concat!("weather-cache/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 10;
}

/// HTTP server defaults
pub mod server {
    /// Listen address when neither `--bind` nor `BIND_ADDR` is given
    pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

    /// Registry file used when `CITIES_FILE` is unset
    pub const DEFAULT_CITIES_FILE: &str = "config/cities.yml";
}

/// Logging and debugging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

// Re-export commonly used constants for convenience
pub use cache::{ENTRY_TTL, ERROR_KEY_PREFIX, WEATHER_KEY_PREFIX};
pub use http::USER_AGENT;
pub use refresh::{BACKOFF_STEP, MAX_ATTEMPTS, REFRESH_INTERVAL};
