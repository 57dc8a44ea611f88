//! In-process cache store with per-entry expiry
//!
//! Used by the integration tests and by `--memory-cache` demo runs that have
//! no Redis at hand. Expiry uses Tokio's clock so paused-time tests can
//! advance past a TTL without sleeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::CacheStore;
use crate::errors::{CacheError, CacheResult};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// TTL-aware in-memory key/value store
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    closed: AtomicBool,
}

impl MemoryCache {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of all live entries, sorted
    pub async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        self.keys().await.len()
    }

    /// Whether the store holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_open(&self) -> CacheResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.ensure_open()?;
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.ensure_open()?;
        let now = Instant::now();
        let entry = Entry {
            value: value.to_string(),
            expires_at: now + ttl,
        };

        // Writes evict expired entries, so the map stays bounded by live keys
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        self.ensure_open()
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.entries.write().await.clear();
        }
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(600);

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("weather_stgo").await.unwrap(), None);

        cache.set_with_ttl("weather_stgo", "{\"temp\":20}", TTL).await.unwrap();
        assert_eq!(
            cache.get("weather_stgo").await.unwrap().as_deref(),
            Some("{\"temp\":20}")
        );
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = MemoryCache::new();
        cache.set_with_ttl("weather_stgo", "first", TTL).await.unwrap();
        cache.set_with_ttl("weather_stgo", "second", TTL).await.unwrap();

        assert_eq!(cache.get("weather_stgo").await.unwrap().as_deref(), Some("second"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache.set_with_ttl("weather_stgo", "{}", TTL).await.unwrap();

        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        assert!(cache.get("weather_stgo").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("weather_stgo").await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_evict_expired_records() {
        let cache = MemoryCache::new();
        cache
            .set_with_ttl("The API request failed in stgo", "The API request failed in stgo", TTL)
            .await
            .unwrap();
        cache.set_with_ttl("weather_lim", "{}", TTL * 2).await.unwrap();

        tokio::time::advance(TTL).await;
        cache.set_with_ttl("weather_stgo", "{}", TTL).await.unwrap();

        let stored: Vec<String> = {
            let entries = cache.entries.read().await;
            let mut keys: Vec<String> = entries.keys().cloned().collect();
            keys.sort();
            keys
        };
        assert_eq!(stored, vec!["weather_lim".to_string(), "weather_stgo".to_string()]);
    }

    #[tokio::test]
    async fn test_close_rejects_further_use() {
        let cache = MemoryCache::new();
        cache.set_with_ttl("weather_stgo", "{}", TTL).await.unwrap();
        cache.close().await;

        assert!(matches!(cache.ping().await, Err(CacheError::Closed)));
        assert!(matches!(cache.get("weather_stgo").await, Err(CacheError::Closed)));
    }
}
