//! Core HTTP operation for provider requests
//!
//! One call is one GET. Retrying belongs to the refresh engine, so nothing
//! here loops or sleeps.

use reqwest::header::ACCEPT;
use reqwest::Client;
use url::Url;

use crate::errors::{ProviderError, ProviderResult};

/// HTTP operations handler for the weather provider
#[derive(Debug, Clone)]
pub struct HttpHandler {
    client: Client,
}

impl HttpHandler {
    /// Creates a new HttpHandler around an already configured client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Issue a JSON GET and return the body text, whatever the status code
    ///
    /// The provider reports logical errors in the body, so non-2xx statuses
    /// are not treated as transport failures.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Request` if the request cannot be sent or the
    /// body cannot be read
    pub async fn get_json_text(
        &self,
        url: &Url,
        query: &[(&str, &str)],
        location: &str,
    ) -> ProviderResult<String> {
        // The request URL carries the API key; it must not reach logs or cache keys
        let request_error = |source: reqwest::Error| ProviderError::Request {
            location: location.to_string(),
            source: source.without_url(),
        };

        let response = self
            .client
            .get(url.as_str())
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(request_error)?;
        tracing::debug!(
            "Provider answered {} for {} ({} bytes)",
            status,
            location,
            text.len()
        );
        Ok(text)
    }
}
