//! Per-location fetch protocol
//!
//! One location, one cycle: up to `max_attempts` provider calls, strictly
//! sequential, with a linear backoff between them. Every terminal state
//! leaves a record in the cache:
//!
//! - snapshot: the payload goes to `weather_<alias>`
//! - provider rejection (`code` present): the `message` goes to
//!   `weather_error_<display name>` and the snapshot is left alone
//! - exhausted: the last failure's text is written under itself, then the
//!   failure is returned to the caller

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::config::RefreshConfig;
use crate::app::cache::CacheStore;
use crate::app::client::WeatherProvider;
use crate::app::registry::Location;
use crate::errors::{error_chain, ProviderError, ProviderResult, RefreshError, RefreshResult};

/// Classified body of one successful HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Weather payload, re-serialized as compact JSON
    Snapshot(String),
    /// Provider-level error such as throttling
    Rejected {
        /// The `code` field as sent
        code: Value,
        /// The `message` field as JSON text (`null` when absent)
        message: String,
    },
}

/// Terminal success states of the protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationOutcome {
    /// Snapshot written after `attempts` provider calls
    Updated { attempts: u32 },
    /// Rejection recorded after `attempts` provider calls
    Rejected { attempts: u32, message: String },
}

impl LocationOutcome {
    /// Provider calls made before reaching this state
    pub fn attempts(&self) -> u32 {
        match self {
            LocationOutcome::Updated { attempts } | LocationOutcome::Rejected { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Classify a provider body
///
/// # Errors
///
/// Returns `ProviderError::InvalidPayload` when the body is not a JSON object
pub fn classify_payload(location: &str, body: &str) -> ProviderResult<FetchOutcome> {
    let value: Value = serde_json::from_str(body).map_err(|e| ProviderError::InvalidPayload {
        location: location.to_string(),
        reason: e.to_string(),
    })?;

    let Some(object) = value.as_object() else {
        return Err(ProviderError::InvalidPayload {
            location: location.to_string(),
            reason: "expected a JSON object".to_string(),
        });
    };

    if let Some(code) = object.get("code") {
        let message = object.get("message").cloned().unwrap_or(Value::Null);
        return Ok(FetchOutcome::Rejected {
            code: code.clone(),
            message: message.to_string(),
        });
    }

    Ok(FetchOutcome::Snapshot(value.to_string()))
}

/// Delay before the retry that follows failed attempt number `attempts`
pub fn backoff_delay(step: Duration, attempts: u32) -> Duration {
    step.saturating_mul(attempts)
}

/// Runs the fetch protocol for single locations
///
/// Cheap to clone; every clone shares the provider and the cache.
#[derive(Clone)]
pub struct LocationFetcher {
    provider: Arc<dyn WeatherProvider>,
    cache: Arc<dyn CacheStore>,
    config: Arc<RefreshConfig>,
}

impl LocationFetcher {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        cache: Arc<dyn CacheStore>,
        config: Arc<RefreshConfig>,
    ) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    /// Refresh one location until it reaches a terminal state
    ///
    /// # Errors
    ///
    /// - `RefreshError::RetriesExhausted` after every attempt failed. The
    ///   failure record has already been written.
    /// - `RefreshError::Cache` if the outcome could not be written
    /// - `RefreshError::InvariantViolation` if the loop ends without an
    ///   outcome, which only a zero attempt limit can cause
    pub async fn refresh(&self, location: &Location) -> RefreshResult<LocationOutcome> {
        let max_attempts = self.config.max_attempts;
        let mut attempts: u32 = 0;

        while attempts < max_attempts {
            match self.attempt(location).await {
                Ok(FetchOutcome::Snapshot(payload)) => {
                    attempts += 1;
                    self.write(location, &location.weather_key(), &payload)
                        .await?;
                    debug!(
                        "Updated {} after {} attempt(s)",
                        location.display_name, attempts
                    );
                    return Ok(LocationOutcome::Updated { attempts });
                }
                Ok(FetchOutcome::Rejected { code, message }) => {
                    attempts += 1;
                    self.write(location, &location.error_key(), &message).await?;
                    warn!(
                        "Provider rejected {} (code {}): {}",
                        location.display_name, code, message
                    );
                    return Ok(LocationOutcome::Rejected { attempts, message });
                }
                Err(err) => {
                    attempts += 1;
                    if attempts == max_attempts {
                        // The record is keyed by its own text; readers never look it up
                        let record = err.to_string();
                        self.write(location, &record, &record).await?;
                        return Err(RefreshError::RetriesExhausted {
                            location: location.display_name.clone(),
                            attempts,
                            source: err,
                        });
                    }

                    let delay = backoff_delay(self.config.backoff_step, attempts);
                    warn!(
                        "Retrying ({}/{}) for {} in {:?}: {}",
                        attempts,
                        max_attempts,
                        location.display_name,
                        delay,
                        error_chain(&err)
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(RefreshError::InvariantViolation {
            location: location.display_name.clone(),
            attempts,
        })
    }

    /// One provider call, classified
    async fn attempt(&self, location: &Location) -> ProviderResult<FetchOutcome> {
        let query = location.provider_query();

        if self.config.failure_rate > 0.0 && fastrand::f64() < self.config.failure_rate {
            return Err(ProviderError::Simulated {
                location: query.to_string(),
            });
        }

        let body = self.provider.fetch(query).await?;
        classify_payload(query, &body)
    }

    async fn write(&self, location: &Location, key: &str, value: &str) -> RefreshResult<()> {
        self.cache
            .set_with_ttl(key, value, self.config.entry_ttl)
            .await
            .map_err(|source| RefreshError::Cache {
                location: location.display_name.clone(),
                source,
            })
    }
}

impl std::fmt::Debug for LocationFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationFetcher")
            .field("cache", &self.cache.backend())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cache::MemoryCache;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Provider that replays a fixed script and records call times
    struct ScriptedProvider {
        script: Mutex<VecDeque<ProviderResult<String>>>,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<ProviderResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl WeatherProvider for ScriptedProvider {
        async fn fetch(&self, location: &str) -> ProviderResult<String> {
            self.calls
                .lock()
                .unwrap()
                .push((location.to_string(), Instant::now()));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(simulated(location)))
        }
    }

    fn simulated(location: &str) -> ProviderError {
        ProviderError::Simulated {
            location: location.to_string(),
        }
    }

    fn santiago() -> Location {
        Location::new("Santiago", "stgo")
    }

    fn fetcher(
        provider: Arc<ScriptedProvider>,
        cache: Arc<MemoryCache>,
        config: RefreshConfig,
    ) -> LocationFetcher {
        LocationFetcher::new(provider, cache, Arc::new(config))
    }

    #[test]
    fn test_classify_snapshot_is_compacted() {
        let outcome = classify_payload("stgo", "{ \"temp\" : 20 }").unwrap();
        assert_eq!(outcome, FetchOutcome::Snapshot("{\"temp\":20}".to_string()));
    }

    #[test]
    fn test_classify_preserves_field_order() {
        let outcome = classify_payload("stgo", r#"{"z":1,"a":2}"#).unwrap();
        assert_eq!(outcome, FetchOutcome::Snapshot(r#"{"z":1,"a":2}"#.to_string()));
    }

    #[test]
    fn test_classify_rejection_keeps_message_as_json() {
        let outcome =
            classify_payload("stgo", r#"{"code":429001,"message":"rate limited"}"#).unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Rejected {
                code: Value::from(429001),
                message: "\"rate limited\"".to_string(),
            }
        );
    }

    #[test]
    fn test_classify_rejection_without_message() {
        let outcome = classify_payload("stgo", r#"{"code":"E1"}"#).unwrap();
        assert!(matches!(outcome, FetchOutcome::Rejected { ref message, .. } if message == "null"));
    }

    #[test]
    fn test_classify_rejects_non_objects() {
        assert!(matches!(
            classify_payload("stgo", "not json"),
            Err(ProviderError::InvalidPayload { .. })
        ));
        assert!(matches!(
            classify_payload("stgo", "[1,2]"),
            Err(ProviderError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_backoff_is_linear() {
        let step = Duration::from_millis(1000);
        assert_eq!(backoff_delay(step, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(step, 2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(step, 3), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_first_attempt_success_writes_snapshot() {
        let provider = ScriptedProvider::new(vec![Ok(r#"{"temp": 20}"#.to_string())]);
        let cache = Arc::new(MemoryCache::new());
        let fetcher = fetcher(provider.clone(), cache.clone(), RefreshConfig::default());

        let outcome = fetcher.refresh(&santiago()).await.unwrap();

        assert_eq!(outcome, LocationOutcome::Updated { attempts: 1 });
        assert_eq!(
            cache.get("weather_stgo").await.unwrap().as_deref(),
            Some(r#"{"temp":20}"#)
        );
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rejection_is_terminal_and_leaves_snapshot() {
        let provider = ScriptedProvider::new(vec![Ok(
            r#"{"code":429001,"message":"rate limited"}"#.to_string(),
        )]);
        let cache = Arc::new(MemoryCache::new());
        cache
            .set_with_ttl("weather_stgo", "{\"temp\":18}", Duration::from_secs(600))
            .await
            .unwrap();
        let fetcher = fetcher(provider.clone(), cache.clone(), RefreshConfig::default());

        let outcome = fetcher.refresh(&santiago()).await.unwrap();

        assert_eq!(outcome.attempts(), 1);
        assert_eq!(
            cache.get("weather_error_Santiago").await.unwrap().as_deref(),
            Some("\"rate limited\"")
        );
        assert_eq!(
            cache.get("weather_stgo").await.unwrap().as_deref(),
            Some("{\"temp\":18}")
        );
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_back_off_linearly_then_succeed() {
        let provider = ScriptedProvider::new(vec![
            Err(simulated("stgo")),
            Err(simulated("stgo")),
            Ok(r#"{"temp":21}"#.to_string()),
        ]);
        let cache = Arc::new(MemoryCache::new());
        let fetcher = fetcher(provider.clone(), cache.clone(), RefreshConfig::default());

        let outcome = fetcher.refresh(&santiago()).await.unwrap();
        assert_eq!(outcome, LocationOutcome::Updated { attempts: 3 });

        let times = provider.call_times();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], Duration::from_millis(1000));
        assert_eq!(times[2] - times[1], Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_writes_failure_record_and_propagates() {
        let provider = ScriptedProvider::new(vec![]);
        let cache = Arc::new(MemoryCache::new());
        let fetcher = fetcher(provider.clone(), cache.clone(), RefreshConfig::default());
        let start = Instant::now();

        let err = fetcher.refresh(&santiago()).await.unwrap_err();

        match err {
            RefreshError::RetriesExhausted {
                location, attempts, ..
            } => {
                assert_eq!(location, "Santiago");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(provider.call_count(), 3);
        // No sleep after the last attempt: 1s + 2s only
        assert_eq!(start.elapsed(), Duration::from_millis(3000));

        let record = "The API request failed in stgo";
        assert_eq!(cache.get(record).await.unwrap().as_deref(), Some(record));
        assert_eq!(cache.get("weather_stgo").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_payload_is_retried() {
        let provider = ScriptedProvider::new(vec![
            Ok("<html>bad gateway</html>".to_string()),
            Ok(r#"{"temp":5}"#.to_string()),
        ]);
        let cache = Arc::new(MemoryCache::new());
        let fetcher = fetcher(provider.clone(), cache.clone(), RefreshConfig::default());

        let outcome = fetcher.refresh(&santiago()).await.unwrap();
        assert_eq!(outcome, LocationOutcome::Updated { attempts: 2 });
    }

    #[tokio::test]
    async fn test_injected_failures_never_reach_provider() {
        let provider = ScriptedProvider::new(vec![Ok(r#"{"temp":20}"#.to_string())]);
        let cache = Arc::new(MemoryCache::new());
        let config = RefreshConfig::default()
            .with_failure_rate(1.0)
            .with_backoff_step(Duration::from_millis(1));
        let fetcher = fetcher(provider.clone(), cache.clone(), config);

        let err = fetcher.refresh(&santiago()).await.unwrap_err();
        assert!(matches!(
            err,
            RefreshError::RetriesExhausted {
                source: ProviderError::Simulated { .. },
                ..
            }
        ));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_attempt_limit_is_invariant_violation() {
        let provider = ScriptedProvider::new(vec![]);
        let cache = Arc::new(MemoryCache::new());
        let config = RefreshConfig::default().with_max_attempts(0);
        let fetcher = fetcher(provider, cache, config);

        let err = fetcher.refresh(&santiago()).await.unwrap_err();
        assert!(matches!(
            err,
            RefreshError::InvariantViolation { attempts: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_cache_failure_is_reported() {
        let provider = ScriptedProvider::new(vec![Ok(r#"{"temp":20}"#.to_string())]);
        let cache = Arc::new(MemoryCache::new());
        cache.close().await;
        let fetcher = fetcher(provider, cache, RefreshConfig::default());

        let err = fetcher.refresh(&santiago()).await.unwrap_err();
        assert!(matches!(err, RefreshError::Cache { .. }));
    }
}
