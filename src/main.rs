//! Weather cache service
//!
//! Refreshes weather snapshots for configured locations into Redis and
//! serves them over HTTP.

use std::process;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use weather_cache::cli::{handle_locations, handle_refresh_once, handle_serve, Cli, Commands};
use weather_cache::config::AppConfig;
use weather_cache::constants::logging;
use weather_cache::errors::{error_chain, Result};

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        let message = error_chain(&e);
        if e.is_recoverable() {
            warn!(category = e.category(), "{}", message);
        } else {
            error!(category = e.category(), "{}", message);
        }
        eprintln!("Error: {}", message);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    // Settings pick the default log level, so they load before logging starts
    let settings = AppConfig::load(cli.global.config.as_deref()).await;
    let configured_level = settings
        .as_ref()
        .map(|s| s.logging.level.clone())
        .unwrap_or_else(|_| logging::DEFAULT_LOG_LEVEL.to_string());
    init_logging(&cli, &configured_level);
    let settings = settings?;

    info!("Weather cache v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve(args) => handle_serve(&cli.global, settings, args).await,
        Commands::RefreshOnce(args) => handle_refresh_once(&cli.global, settings, args).await,
        Commands::Locations => handle_locations(&cli.global).await,
    }
}

/// Initialize logging from CLI verbosity flags, falling back to the settings file
fn init_logging(cli: &Cli, configured_level: &str) {
    let log_level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| configured_level.to_string());

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("weather_cache={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
