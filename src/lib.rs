//! Weather Cache Library
//!
//! Keeps current weather for a fixed set of locations in a TTL cache,
//! refreshed on a timer with per-location retries, and serves the cached
//! payloads over HTTP.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;
pub mod server;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
