//! Prelude module for the weather cache library
//!
//! Re-exports the items needed to assemble a refresh engine and a read API
//! with a single `use weather_cache::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use weather_cache::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = Arc::new(LocationRegistry::load(Path::new("config/cities.yml"))?);
//!     let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
//!     let stats = Arc::new(tokio::sync::RwLock::new(RefreshStats::default()));
//!     let _state = AppState::new(registry, cache, stats);
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components
pub use crate::app::{
    CacheConfig, CacheStore, ClientConfig, CycleReport, Location, LocationRegistry, MemoryCache,
    RedisCache, RefreshConfig, RefreshEngine, RefreshStats, WeatherClient, WeatherProvider,
};

// Configuration and serving
pub use crate::config::{AppConfig, ServiceEnv};
pub use crate::server::AppState;

// Commonly used constants
pub use crate::constants::{ENTRY_TTL, MAX_ATTEMPTS, REFRESH_INTERVAL};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;
