//! HTTP read API
//!
//! `GET /weather/{location}` serves the cached snapshot for a display name
//! exactly as it was stored. The handlers only read the cache; nothing here
//! talks to the refresh engine except through the shared statistics.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::app::cache::CacheStore;
use crate::app::refresh::{wait_for_shutdown_signal, CycleReport, RefreshStats};
use crate::app::registry::LocationRegistry;
use crate::errors::ReadError;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<LocationRegistry>,
    pub cache: Arc<dyn CacheStore>,
    pub stats: Arc<RwLock<RefreshStats>>,
}

impl AppState {
    pub fn new(
        registry: Arc<LocationRegistry>,
        cache: Arc<dyn CacheStore>,
        stats: Arc<RwLock<RefreshStats>>,
    ) -> Self {
        Self {
            registry,
            cache,
            stats,
        }
    }

    /// Resolve a display name and read its cached snapshot
    ///
    /// # Errors
    ///
    /// - `ReadError::LocationNotFound` for names missing from the registry
    /// - `ReadError::NotCached` when the key is absent or expired
    /// - `ReadError::Cache` when the backend fails
    pub async fn read_weather(&self, name: &str) -> Result<String, ReadError> {
        let location = self
            .registry
            .get(name)
            .ok_or_else(|| ReadError::LocationNotFound {
                name: name.to_string(),
            })?;

        self.cache
            .get(&location.weather_key())
            .await?
            .ok_or_else(|| ReadError::NotCached {
                name: name.to_string(),
            })
    }
}

impl ReadError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReadError::LocationNotFound { .. } => StatusCode::NOT_FOUND,
            ReadError::NotCached { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ReadError::Cache(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ReadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ReadError::Cache(source) = &self {
            warn!("Cache read failed: {}", source);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// JSON response for the health check
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache_backend: &'static str,
    pub cache_reachable: bool,
    pub locations: usize,
    pub cycles_completed: u64,
    pub success_rate: f64,
    pub last_cycle: Option<CycleReport>,
}

/// GET /weather/{location} - Cached snapshot for a display name
async fn get_weather(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Result<Response, ReadError> {
    let payload = state.read_weather(&location).await?;
    debug!("Served cached weather for {}", location);
    Ok(([(header::CONTENT_TYPE, "application/json")], payload).into_response())
}

/// GET /locations - Configured display names
async fn list_locations(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(
        state
            .registry
            .display_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    )
}

/// GET /health - Cache reachability and refresh progress
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let cache_reachable = state.cache.ping().await.is_ok();
    let stats = state.stats.read().await;

    let (status_code, status) = if cache_reachable {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            cache_backend: state.cache.backend(),
            cache_reachable,
            locations: state.registry.len(),
            cycles_completed: stats.cycles_completed,
            success_rate: stats.success_rate(),
            last_cycle: stats.last_cycle.clone(),
        }),
    )
}

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/locations", get(list_locations))
        .route("/weather/{location}", get(get_weather))
        .with_state(state)
}

/// Serve until shutdown is broadcast, then finish in-flight requests
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown_rx: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(wait_for_shutdown_signal(shutdown_rx))
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
