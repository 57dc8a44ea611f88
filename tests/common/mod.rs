//! Shared fixtures for the integration tests
//!
//! A wiremock server plays the weather provider and the in-memory store
//! plays Redis, so the tests need no external services.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use weather_cache::app::{
    ClientConfig, LocationRegistry, MemoryCache, RefreshConfig, RefreshEngine, WeatherClient,
};

pub const REALTIME_PATH: &str = "/v4/weather/realtime";
pub const API_KEY: &str = "test-key";

/// Retry quickly and give up on slow responses quickly
pub fn fast_refresh_config() -> RefreshConfig {
    RefreshConfig::default()
        .with_backoff_step(Duration::from_millis(10))
        .with_shutdown_timeout(Duration::from_secs(2))
}

pub fn fast_client_config() -> ClientConfig {
    ClientConfig::default().with_request_timeout(Duration::from_millis(300))
}

pub fn registry(pairs: &[(&str, &str)]) -> Arc<LocationRegistry> {
    Arc::new(LocationRegistry::from_pairs(pairs.iter().copied(), Path::new("cities.yml")).unwrap())
}

pub fn client_for(server: &MockServer) -> Arc<WeatherClient> {
    let base_url = Url::parse(&format!("{}{}", server.uri(), REALTIME_PATH)).unwrap();
    Arc::new(WeatherClient::new(&fast_client_config(), base_url, API_KEY).unwrap())
}

/// Engine over a wiremock provider and a fresh in-memory cache
pub fn engine_for(
    server: &MockServer,
    pairs: &[(&str, &str)],
) -> (RefreshEngine, Arc<MemoryCache>, Arc<LocationRegistry>) {
    let cache = Arc::new(MemoryCache::new());
    let registry = registry(pairs);
    let engine = RefreshEngine::new(
        fast_refresh_config(),
        registry.clone(),
        client_for(server),
        cache.clone(),
    );
    (engine, cache, registry)
}

/// Answer every request for `location` with `body` and a 200 status
pub async fn mount_body(server: &MockServer, location: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(REALTIME_PATH))
        .and(query_param("location", location))
        .and(query_param("apikey", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
