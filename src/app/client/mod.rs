//! HTTP client for the weather provider
//!
//! The provider is reached through the [`WeatherProvider`] trait so the
//! refresh engine can be driven by scripted providers in tests. The real
//! implementation, [`WeatherClient`], issues exactly one GET per call and
//! hands the raw body back; classifying the body is the caller's job.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: The single provider GET

use async_trait::async_trait;
use url::Url;

use crate::errors::ProviderResult;

pub mod config;
pub mod http;

pub use config::ClientConfig;

use http::HttpHandler;

/// Source of raw weather payloads, one call per attempt
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch the current conditions for a provider location query
    ///
    /// # Errors
    ///
    /// Returns a `ProviderError` on transport failure. Provider-level
    /// rejections arrive as `Ok` bodies.
    async fn fetch(&self, location: &str) -> ProviderResult<String>;
}

/// Weather provider client backed by reqwest
///
/// Cheap to share behind an `Arc`; the inner connection pool is safe for
/// concurrent use across location tasks.
pub struct WeatherClient {
    http_handler: HttpHandler,
    base_url: Url,
    api_key: String,
}

impl WeatherClient {
    /// Creates a new client for the given realtime endpoint
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Client` if HTTP client creation fails
    pub fn new(config: &ClientConfig, base_url: Url, api_key: impl Into<String>) -> ProviderResult<Self> {
        let client = config.build_http_client()?;

        tracing::info!("Created weather provider client for {}", base_url);

        Ok(Self {
            http_handler: HttpHandler::new(client),
            base_url,
            api_key: api_key.into(),
        })
    }
}

impl std::fmt::Debug for WeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl WeatherProvider for WeatherClient {
    async fn fetch(&self, location: &str) -> ProviderResult<String> {
        let query = [("location", location), ("apikey", self.api_key.as_str())];
        self.http_handler
            .get_json_text(&self.base_url, &query, location)
            .await
    }
}
