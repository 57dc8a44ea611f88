//! Command-line argument parsing for the weather cache
//!
//! This module defines the CLI structure using clap derive macros: the
//! long-running service, a one-shot refresh for smoke testing, and a
//! registry listing.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Weather cache - keep current conditions for configured locations in Redis
#[derive(Parser, Debug)]
#[command(
    name = "weather_cache",
    version,
    about = "Refresh weather snapshots into a cache and serve them over HTTP",
    long_about = "Periodically fetches current conditions for every configured location,
retrying failed requests with linear backoff, and serves the cached payloads from GET /weather/{location}."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (trace level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - warnings and errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Location registry file, overriding CITIES_FILE
    #[arg(long, global = true, value_name = "FILE")]
    pub cities: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the refresh engine and the HTTP read API until stopped
    Serve(ServeArgs),

    /// Run a single refresh cycle and print its report
    RefreshOnce(RefreshOnceArgs),

    /// Validate the location registry and list its cache keys
    Locations,
}

/// Arguments for the serve command
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Listen address, overriding BIND_ADDR and the settings file
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    /// Keep snapshots in process memory instead of Redis
    #[arg(long)]
    pub memory_cache: bool,

    /// Fail a share of provider attempts on purpose to exercise retries
    #[arg(long)]
    pub simulate_failures: bool,
}

/// Arguments for the refresh-once command
#[derive(Args, Debug, Clone)]
pub struct RefreshOnceArgs {
    /// Keep snapshots in process memory instead of Redis
    #[arg(long)]
    pub memory_cache: bool,

    /// Fail a share of provider attempts on purpose to exercise retries
    #[arg(long)]
    pub simulate_failures: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level requested by verbosity flags, if any
    ///
    /// `None` means no flag was given and the settings file decides.
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::WARN)
        } else if self.global.very_verbose {
            Some(tracing::Level::TRACE)
        } else if self.global.verbose {
            Some(tracing::Level::DEBUG)
        } else {
            None
        }
    }
}
