//! Configuration management for the weather cache
//!
//! Two layers feed the service:
//!
//! - [`ServiceEnv`]: connection settings and secrets from the environment
//!   (after `.env` is loaded). These are required and read once at startup.
//! - [`AppConfig`]: tuning knobs from an optional TOML file. Every field has
//!   a default, so running without a settings file is normal.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::app::{CacheConfig, ClientConfig, RefreshConfig};
use crate::constants::{env as env_constants, logging, server};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Refresh schedule and retry policy
    pub refresh: RefreshConfig,
    /// Provider HTTP client settings
    pub client: ClientConfig,
    /// Cache connection pool settings
    pub cache: CacheConfig,
    /// HTTP server settings
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address; overrides `BIND_ADDR` when set
    pub bind_addr: Option<SocketAddr>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application (error, warn, info, debug, trace)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration, falling back to defaults when no file exists
    ///
    /// An explicit path must exist; the standard locations are optional.
    pub async fn load(config_file_override: Option<&Path>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No settings file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check every section
    pub fn validate(&self) -> ConfigResult<()> {
        self.refresh
            .validate()
            .map_err(|reason| ConfigError::InvalidValue {
                field: "refresh".to_string(),
                value: format!("{:?}", self.refresh),
                reason,
            })?;
        self.cache.validate()?;

        if self.client.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "client.request_timeout".to_string(),
                value: "0s".to_string(),
                reason: "Requests need a non-zero timeout".to_string(),
            });
        }

        Ok(())
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from("./weather-cache.toml")];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Default config file path for the current user
    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weather-cache").join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }
}

/// Settings resolved from the process environment
#[derive(Clone)]
pub struct ServiceEnv {
    /// Redis host name
    pub redis_host: String,
    /// Redis port
    pub redis_port: u16,
    /// Provider realtime endpoint
    pub weather_url: Url,
    /// Provider API key
    pub api_key: String,
    /// Location registry file
    pub cities_file: PathBuf,
    /// HTTP listen address
    pub bind_addr: SocketAddr,
}

impl std::fmt::Debug for ServiceEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEnv")
            .field("redis_host", &self.redis_host)
            .field("redis_port", &self.redis_port)
            .field("weather_url", &self.weather_url.as_str())
            .field("api_key", &"<redacted>")
            .field("cities_file", &self.cities_file)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl ServiceEnv {
    /// Read settings from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &str| -> ConfigResult<String> {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingEnv {
                    var: var.to_string(),
                })
        };
        let invalid = |var: &str, value: &str, reason: String| ConfigError::InvalidValue {
            field: var.to_string(),
            value: value.to_string(),
            reason,
        };

        let redis_host = required(env_constants::REDIS_HOST)?;

        let port = required(env_constants::REDIS_PORT)?;
        let redis_port = port
            .parse::<u16>()
            .map_err(|e| invalid(env_constants::REDIS_PORT, &port, e.to_string()))?;

        let url = required(env_constants::WEATHER_URL)?;
        let weather_url =
            Url::parse(&url).map_err(|e| invalid(env_constants::WEATHER_URL, &url, e.to_string()))?;

        let api_key = required(env_constants::API_KEY)?;

        let cities_file = lookup(env_constants::CITIES_FILE)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(server::DEFAULT_CITIES_FILE));

        let bind = lookup(env_constants::BIND_ADDR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| server::DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| invalid(env_constants::BIND_ADDR, &bind, e.to_string()))?;

        Ok(Self {
            redis_host,
            redis_port,
            weather_url,
            api_key,
            cities_file,
            bind_addr,
        })
    }
}
