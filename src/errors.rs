//! Error types for the weather cache
//!
//! Each concern gets its own error enum; [`AppError`] folds them together for
//! the CLI and the server. Provider and cache errors never escape a single
//! location's refresh task, only configuration errors stop the process.

use std::path::PathBuf;

use thiserror::Error;

/// Startup configuration errors. These are always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid settings file format
    #[error("Invalid settings file format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Location registry is not valid YAML or lacks the `cities` mapping
    #[error("Invalid location registry {path}: {reason}")]
    InvalidRegistry { path: PathBuf, reason: String },

    /// Two display names map to the same cache alias
    #[error("Alias '{alias}' is used by both '{first}' and '{second}'")]
    DuplicateAlias {
        alias: String,
        first: String,
        second: String,
    },

    /// Required environment variable is not set
    #[error("Missing required environment variable: {var}")]
    MissingEnv { var: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Errors from a single provider attempt. All of them are retried.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// Request failed on the wire (connect, timeout, body read)
    #[error("The API request failed in {location}")]
    Request {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    /// Failure injected before the request was sent
    #[error("The API request failed in {location}")]
    Simulated { location: String },

    /// Body was not a JSON object
    #[error("Invalid provider payload for {location}: {reason}")]
    InvalidPayload { location: String, reason: String },
}

/// Cache backend errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Pool could not be created from the connection settings
    #[error("Failed to create cache connection pool")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    /// No connection could be checked out of the pool
    #[error("Cache connection pool error")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Redis rejected or failed a command
    #[error("Cache command failed")]
    Redis(#[from] redis::RedisError),

    /// The store was used after `close()`
    #[error("Cache store is closed")]
    Closed,
}

/// Terminal failures of one location's refresh protocol
#[derive(Error, Debug)]
pub enum RefreshError {
    /// Every attempt failed; the last failure is kept as the source
    #[error("Maximum attempts ({attempts}) exceeded for {location}")]
    RetriesExhausted {
        location: String,
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// Outcome could not be written to the cache
    #[error("Failed to write refresh outcome for {location}")]
    Cache {
        location: String,
        #[source]
        source: CacheError,
    },

    /// Retry loop ended without reaching a terminal state
    #[error("Refresh for {location} ended after {attempts} attempts without an outcome")]
    InvariantViolation { location: String, attempts: u32 },
}

/// Read path errors, mapped to HTTP statuses by the server
#[derive(Error, Debug)]
pub enum ReadError {
    /// Display name is not in the registry
    #[error("location not found: {name}")]
    LocationNotFound { name: String },

    /// Registry knows the location but nothing is cached for it
    #[error("no cached weather for {name} yet")]
    NotCached { name: String },

    /// Cache lookup failed
    #[error("cache lookup failed")]
    Cache(#[from] CacheError),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Provider error
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Refresh error
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Provider(ProviderError::Request { .. })
            | AppError::Provider(ProviderError::Simulated { .. })
            | AppError::Provider(ProviderError::InvalidPayload { .. })
            | AppError::Cache(CacheError::Pool(_))
            | AppError::Cache(CacheError::Redis(_))
            | AppError::Refresh(_) => true,

            AppError::Config(_)
            | AppError::Provider(ProviderError::Client(_))
            | AppError::Cache(CacheError::CreatePool(_))
            | AppError::Cache(CacheError::Closed)
            | AppError::Io(_) => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Provider(_) => "provider",
            AppError::Cache(_) => "cache",
            AppError::Refresh(_) => "refresh",
            AppError::Io(_) => "io",
        }
    }
}

/// Render an error and its sources as `outer: cause: root`
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Provider result type alias
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Refresh result type alias
pub type RefreshResult<T> = std::result::Result<T, RefreshError>;
