//! Core application logic for the weather cache
//!
//! This module contains the location registry, the provider client, the
//! cache stores and the refresh engine that ties them together.
//!
//! Write path: [`RefreshEngine`] → [`WeatherProvider`] → [`CacheStore`].
//! Read path: [`LocationRegistry`] → [`CacheStore`]. The two paths only meet
//! in the cache.

pub mod cache;
pub mod client;
pub mod refresh;
pub mod registry;

// Re-export main public API
pub use cache::{CacheConfig, CacheStore, MemoryCache, RedisCache};
pub use client::{ClientConfig, WeatherClient, WeatherProvider};
pub use refresh::{
    CycleReport, FetchOutcome, LocationFetcher, LocationOutcome, RefreshConfig, RefreshEngine,
    RefreshStats,
};
pub use registry::{Location, LocationRegistry};
