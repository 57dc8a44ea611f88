//! Periodic refresh of every configured location
//!
//! The engine runs on its own background task for the life of the process.
//! Each cycle spawns one task per location, waits for all of them to reach a
//! terminal state, then sleeps for the configured interval. Cycles never
//! overlap and one location's failure never aborts its siblings.
//!
//! # Architecture
//!
//! - [`config`] - Schedule, retry policy and shutdown settings
//! - [`fetch`] - Per-location retry protocol and payload classification
//! - [`stats`] - Cycle reports and running totals
//! - [`signals`] - Signal handling for graceful shutdown
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use url::Url;
//! use weather_cache::app::{
//!     ClientConfig, LocationRegistry, MemoryCache, RefreshConfig, RefreshEngine, WeatherClient,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(LocationRegistry::load(Path::new("config/cities.yml"))?);
//! let client = WeatherClient::new(
//!     &ClientConfig::default(),
//!     Url::parse("https://api.example.com/v4/weather/realtime")?,
//!     "api-key",
//! )?;
//! let engine = RefreshEngine::new(
//!     RefreshConfig::default(),
//!     registry,
//!     Arc::new(client),
//!     Arc::new(MemoryCache::new()),
//! );
//!
//! let report = engine.run_cycle().await;
//! println!("{} of {} locations updated", report.succeeded, report.locations);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod fetch;
pub mod signals;
pub mod stats;

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::app::cache::CacheStore;
use crate::app::client::WeatherProvider;
use crate::app::registry::LocationRegistry;
use crate::errors::{error_chain, RefreshError, RefreshResult};

pub use config::RefreshConfig;
pub use fetch::{backoff_delay, classify_payload, FetchOutcome, LocationFetcher, LocationOutcome};
pub use signals::{create_shutdown_channel, wait_for_shutdown_signal, SignalHandler};
pub use stats::{CycleReport, RefreshStats};

type LocationTasks = JoinSet<(String, RefreshResult<LocationOutcome>)>;

/// Drives refresh cycles over the location registry
pub struct RefreshEngine {
    config: Arc<RefreshConfig>,
    registry: Arc<LocationRegistry>,
    fetcher: LocationFetcher,
    stats: Arc<RwLock<RefreshStats>>,
}

impl RefreshEngine {
    /// Create an engine over shared provider and cache handles
    pub fn new(
        config: RefreshConfig,
        registry: Arc<LocationRegistry>,
        provider: Arc<dyn WeatherProvider>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        let config = Arc::new(config);
        let fetcher = LocationFetcher::new(provider, cache, config.clone());

        Self {
            config,
            registry,
            fetcher,
            stats: Arc::new(RwLock::new(RefreshStats::default())),
        }
    }

    /// Shared handle to the running totals
    pub fn stats_handle(&self) -> Arc<RwLock<RefreshStats>> {
        self.stats.clone()
    }

    /// Engine configuration
    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Run the engine on a background task until shutdown is broadcast
    pub fn spawn(self, shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown_rx))
    }

    /// Run one complete cycle: fan out over every location, wait for all
    pub async fn run_cycle(&self) -> CycleReport {
        let clock = Instant::now();
        let mut report = CycleReport::begin(self.registry.len());
        let mut tasks = self.spawn_cycle();

        Self::collect(&mut tasks, &mut report).await;
        self.finish_cycle(report, clock).await
    }

    /// Loop cycles until shutdown
    ///
    /// A shutdown during a cycle gives in-flight tasks `shutdown_timeout` to
    /// finish, then aborts the rest. A shutdown during the inter-cycle sleep
    /// returns immediately.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            "Starting refresh engine for {} locations (interval {:?}, {} attempts)",
            self.registry.len(),
            self.config.interval,
            self.config.max_attempts
        );

        loop {
            let clock = Instant::now();
            let mut report = CycleReport::begin(self.registry.len());
            let mut tasks = self.spawn_cycle();

            let completed = tokio::select! {
                _ = Self::collect(&mut tasks, &mut report) => true,
                _ = shutdown_rx.recv() => false,
            };

            if !completed {
                info!(
                    "Shutdown requested mid-cycle, waiting up to {:?} for {} location(s)",
                    self.config.shutdown_timeout,
                    tasks.len()
                );
                let drain = Self::collect(&mut tasks, &mut report);
                if tokio::time::timeout(self.config.shutdown_timeout, drain)
                    .await
                    .is_err()
                {
                    let remaining = tasks.len();
                    warn!("Aborting {} unfinished location task(s)", remaining);
                    tasks.shutdown().await;
                    report.cancelled += remaining;
                }
                self.finish_cycle(report, clock).await;
                break;
            }

            self.finish_cycle(report, clock).await;

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = shutdown_rx.recv() => {
                    debug!("Refresh engine received shutdown signal while idle");
                    break;
                }
            }
        }

        info!("Refresh engine stopped");
    }

    fn spawn_cycle(&self) -> LocationTasks {
        let mut tasks = JoinSet::new();
        for location in self.registry.locations() {
            let fetcher = self.fetcher.clone();
            let location = location.clone();
            tasks.spawn(async move {
                let result = fetcher.refresh(&location).await;
                (location.display_name, result)
            });
        }
        tasks
    }

    /// Fan in finished tasks. Cancel-safe: dropping this mid-way loses nothing.
    async fn collect(tasks: &mut LocationTasks, report: &mut CycleReport) {
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, result)) => {
                    match &result {
                        Ok(LocationOutcome::Updated { attempts }) => {
                            debug!("{} refreshed ({} attempt(s))", name, attempts)
                        }
                        Ok(LocationOutcome::Rejected { .. }) => {}
                        Err(e @ RefreshError::RetriesExhausted { .. }) => {
                            error!("{}", error_chain(e))
                        }
                        Err(e) => error!("Refresh of {} failed: {}", name, error_chain(e)),
                    }
                    report.record(&result);
                }
                Err(e) if e.is_cancelled() => report.cancelled += 1,
                Err(e) => {
                    error!("Location task panicked: {}", e);
                    report.failed += 1;
                }
            }
        }
    }

    async fn finish_cycle(&self, mut report: CycleReport, clock: Instant) -> CycleReport {
        report.duration = clock.elapsed();
        info!(
            "Refresh cycle finished in {:.2}s: {} updated, {} rejected, {} exhausted, {} failed, {} cancelled",
            report.duration.as_secs_f64(),
            report.succeeded,
            report.rejected,
            report.exhausted,
            report.failed,
            report.cancelled
        );
        self.stats.write().await.record_cycle(report.clone());
        report
    }
}

#[cfg(test)]
mod tests;
