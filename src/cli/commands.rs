//! Command handlers for the weather cache CLI
//!
//! Each handler resolves settings, environment and registry up front so a
//! bad configuration stops the process before anything is served.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::app::cache::{CacheStore, MemoryCache, RedisCache};
use crate::app::client::{WeatherClient, WeatherProvider};
use crate::app::refresh::{create_shutdown_channel, CycleReport, RefreshEngine, SignalHandler};
use crate::app::registry::LocationRegistry;
use crate::cli::args::{GlobalArgs, RefreshOnceArgs, ServeArgs};
use crate::config::{AppConfig, ServiceEnv};
use crate::constants::{env as env_constants, refresh, server as server_constants};
use crate::errors::Result;
use crate::server::{self, AppState};

/// Handle the serve command: engine plus HTTP API until a shutdown signal
pub async fn handle_serve(
    global: &GlobalArgs,
    mut settings: AppConfig,
    args: ServeArgs,
) -> Result<()> {
    if args.simulate_failures {
        enable_failure_injection(&mut settings);
    }
    let env = ServiceEnv::from_env()?;
    let registry = load_registry(global.cities.clone().unwrap_or(env.cities_file.clone()))?;
    let cache = build_cache(&env, &settings, args.memory_cache)?;
    let provider = build_provider(&env, &settings)?;

    let bind_addr = args
        .bind
        .or(settings.server.bind_addr)
        .unwrap_or(env.bind_addr);
    let listener = TcpListener::bind(bind_addr).await?;

    if let Err(e) = cache.ping().await {
        warn!("Cache ({}) is not reachable yet: {}", cache.backend(), e);
    }

    // Subscribe everything before signals can fire
    let (shutdown_tx, engine_rx) = create_shutdown_channel();
    let server_rx = shutdown_tx.subscribe();
    let signal_task = SignalHandler::new(shutdown_tx.clone()).setup();

    let engine = RefreshEngine::new(
        settings.refresh.clone(),
        registry.clone(),
        provider,
        cache.clone(),
    );
    let state = AppState::new(registry, cache.clone(), engine.stats_handle());
    let engine_task = engine.spawn(engine_rx);

    let server_result = server::serve(listener, state, server_rx).await;

    // The server may have stopped on an error; make sure the engine follows
    let _ = shutdown_tx.send(());
    if let Err(e) = engine_task.await {
        error!("Refresh engine task failed: {}", e);
    }
    signal_task.abort();

    cache.close().await;
    info!("Shutdown complete");

    Ok(server_result?)
}

/// Handle the refresh-once command: one cycle, then print the report
pub async fn handle_refresh_once(
    global: &GlobalArgs,
    mut settings: AppConfig,
    args: RefreshOnceArgs,
) -> Result<()> {
    if args.simulate_failures {
        enable_failure_injection(&mut settings);
    }
    let env = ServiceEnv::from_env()?;
    let registry = load_registry(global.cities.clone().unwrap_or(env.cities_file.clone()))?;
    let cache = build_cache(&env, &settings, args.memory_cache)?;
    let provider = build_provider(&env, &settings)?;

    let engine = RefreshEngine::new(settings.refresh.clone(), registry, provider, cache.clone());
    let report = engine.run_cycle().await;
    drop(engine);

    print_report(&report);
    cache.close().await;
    Ok(())
}

/// Handle the locations command: validate and list the registry
pub async fn handle_locations(global: &GlobalArgs) -> Result<()> {
    let path = global.cities.clone().unwrap_or_else(cities_file_from_env);
    let registry = load_registry(path)?;

    println!("📍 Locations ({})", registry.source().display());
    println!("====================");
    for location in registry.locations() {
        println!(
            "  {:<24} {:<28} {}",
            location.display_name,
            location.weather_key(),
            location.error_key()
        );
    }
    println!();
    println!("{} location(s) configured", registry.len());
    Ok(())
}

fn enable_failure_injection(settings: &mut AppConfig) {
    if settings.refresh.failure_rate == 0.0 {
        settings.refresh.failure_rate = refresh::DEMO_FAILURE_RATE;
    }
    warn!(
        "Failure injection enabled: {:.0}% of attempts will fail",
        settings.refresh.failure_rate * 100.0
    );
}

fn cities_file_from_env() -> PathBuf {
    std::env::var(env_constants::CITIES_FILE)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(server_constants::DEFAULT_CITIES_FILE))
}

fn load_registry(path: PathBuf) -> Result<Arc<LocationRegistry>> {
    let registry = LocationRegistry::load(&path)?;
    Ok(Arc::new(registry))
}

fn build_cache(
    env: &ServiceEnv,
    settings: &AppConfig,
    in_memory: bool,
) -> Result<Arc<dyn CacheStore>> {
    if in_memory {
        info!("Using in-process cache; snapshots are lost on exit");
        return Ok(Arc::new(MemoryCache::new()));
    }
    let cache = RedisCache::connect(&env.redis_host, env.redis_port, &settings.cache)?;
    Ok(Arc::new(cache))
}

fn build_provider(env: &ServiceEnv, settings: &AppConfig) -> Result<Arc<dyn WeatherProvider>> {
    let client = WeatherClient::new(&settings.client, env.weather_url.clone(), &env.api_key)?;
    Ok(Arc::new(client))
}

fn print_report(report: &CycleReport) {
    println!("🌤  Refresh cycle report");
    println!("====================");
    println!("Started:    {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Duration:   {:.2}s", report.duration.as_secs_f64());
    println!("Locations:  {}", report.locations);
    println!("Updated:    {}", report.succeeded);
    println!("Rejected:   {}", report.rejected);
    println!("Exhausted:  {}", report.exhausted);
    if report.failed > 0 {
        println!("Failed:     {}", report.failed);
    }
    println!();
    if report.is_clean() {
        println!("✅ All locations refreshed");
    } else {
        println!("⚠️  Some locations were not refreshed, see the log for details");
    }
}
