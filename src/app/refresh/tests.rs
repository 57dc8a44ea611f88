//! Engine-level tests: fan-out isolation, scheduling and shutdown

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::app::cache::MemoryCache;
use crate::errors::{ProviderError, ProviderResult};

#[derive(Clone)]
enum Behavior {
    Body(&'static str),
    Fail,
    Hang,
}

/// Provider answering per location query, counting calls
struct MapProvider {
    behaviors: HashMap<String, Behavior>,
    calls: AtomicUsize,
}

impl MapProvider {
    fn new(behaviors: &[(&str, Behavior)]) -> Arc<Self> {
        Arc::new(Self {
            behaviors: behaviors
                .iter()
                .map(|(query, behavior)| (query.to_string(), behavior.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for MapProvider {
    async fn fetch(&self, location: &str) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviors.get(location) {
            Some(Behavior::Body(body)) => Ok(body.to_string()),
            Some(Behavior::Hang) => std::future::pending().await,
            Some(Behavior::Fail) | None => Err(ProviderError::Simulated {
                location: location.to_string(),
            }),
        }
    }
}

fn registry(pairs: &[(&str, &str)]) -> Arc<LocationRegistry> {
    Arc::new(
        LocationRegistry::from_pairs(pairs.iter().copied(), Path::new("cities.yml")).unwrap(),
    )
}

fn engine(
    pairs: &[(&str, &str)],
    provider: Arc<MapProvider>,
    cache: Arc<MemoryCache>,
    config: RefreshConfig,
) -> RefreshEngine {
    RefreshEngine::new(config, registry(pairs), provider, cache)
}

#[tokio::test(start_paused = true)]
async fn test_cycle_isolates_failing_location() {
    let provider = MapProvider::new(&[
        ("stgo", Behavior::Body(r#"{"temp":20}"#)),
        ("lim", Behavior::Fail),
        ("bog", Behavior::Body(r#"{"code":429001,"message":"rate limited"}"#)),
    ]);
    let cache = Arc::new(MemoryCache::new());
    let engine = engine(
        &[("Santiago", "stgo"), ("Lima", "lim"), ("Bogota", "bog")],
        provider.clone(),
        cache.clone(),
        RefreshConfig::default(),
    );

    let report = engine.run_cycle().await;

    assert_eq!(report.locations, 3);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.exhausted, 1);
    assert_eq!(report.total_processed(), 3);
    // 1 + 1 + 3 attempts
    assert_eq!(provider.calls(), 5);

    assert_eq!(
        cache.get("weather_stgo").await.unwrap().as_deref(),
        Some(r#"{"temp":20}"#)
    );
    assert_eq!(
        cache.get("weather_error_Bogota").await.unwrap().as_deref(),
        Some("\"rate limited\"")
    );
    assert!(cache.get("weather_bog").await.unwrap().is_none());
    assert!(cache
        .get("The API request failed in lim")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_run_cycle_updates_shared_stats() {
    let provider = MapProvider::new(&[("stgo", Behavior::Body(r#"{"temp":20}"#))]);
    let cache = Arc::new(MemoryCache::new());
    let engine = engine(
        &[("Santiago", "stgo")],
        provider,
        cache,
        RefreshConfig::default(),
    );
    let stats = engine.stats_handle();

    let report = engine.run_cycle().await;
    assert!(report.is_clean());

    let stats = stats.read().await;
    assert_eq!(stats.cycles_completed, 1);
    assert_eq!(stats.total_succeeded, 1);
    assert_eq!(stats.last_cycle.as_ref(), Some(&report));
}

#[tokio::test(start_paused = true)]
async fn test_cycles_repeat_on_interval() {
    let provider = MapProvider::new(&[("stgo", Behavior::Body(r#"{"temp":20}"#))]);
    let cache = Arc::new(MemoryCache::new());
    let engine = engine(
        &[("Santiago", "stgo")],
        provider.clone(),
        cache,
        RefreshConfig::default(),
    );
    let stats = engine.stats_handle();
    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

    let handle = engine.spawn(shutdown_rx);

    // First cycle at t=0, second at t=300s
    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(stats.read().await.cycles_completed, 2);
    assert_eq!(provider.calls(), 2);

    let _ = shutdown_tx.send(());
    handle.await.unwrap();
    assert_eq!(stats.read().await.cycles_completed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_aborts_hung_cycle_after_timeout() {
    let provider = MapProvider::new(&[
        ("stgo", Behavior::Body(r#"{"temp":20}"#)),
        ("lim", Behavior::Hang),
    ]);
    let cache = Arc::new(MemoryCache::new());
    let engine = engine(
        &[("Santiago", "stgo"), ("Lima", "lim")],
        provider,
        cache.clone(),
        RefreshConfig::default().with_shutdown_timeout(Duration::from_secs(2)),
    );
    let stats = engine.stats_handle();
    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

    let handle = engine.spawn(shutdown_rx);
    tokio::time::sleep(Duration::from_millis(10)).await;
    let _ = shutdown_tx.send(());
    handle.await.unwrap();

    let stats = stats.read().await;
    let last = stats.last_cycle.as_ref().unwrap();
    assert_eq!(last.succeeded, 1);
    assert_eq!(last.cancelled, 1);
    assert!(cache.get("weather_stgo").await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_lets_retrying_cycle_drain() {
    let provider = MapProvider::new(&[("lim", Behavior::Fail)]);
    let cache = Arc::new(MemoryCache::new());
    let engine = engine(
        &[("Lima", "lim")],
        provider.clone(),
        cache,
        RefreshConfig::default().with_shutdown_timeout(Duration::from_secs(10)),
    );
    let stats = engine.stats_handle();
    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

    let handle = engine.spawn(shutdown_rx);
    // Shutdown lands during the first backoff; retries still fit the window
    tokio::time::sleep(Duration::from_millis(500)).await;
    let _ = shutdown_tx.send(());
    handle.await.unwrap();

    assert_eq!(provider.calls(), 3);
    let stats = stats.read().await;
    assert_eq!(stats.cycles_completed, 1);
    assert_eq!(stats.total_exhausted, 1);
}
