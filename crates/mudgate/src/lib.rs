//! # mudgate - telnet front-end for text game servers
//!
//! Accepts telnet clients, negotiates linemode and window size with each of
//! them and publishes the resulting sessions into a shared registry. A
//! separate port answers stats requests with the server uptime and the names
//! of logged-in players.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! mudgate
//!
//! # Specify custom configuration
//! mudgate --config production.toml
//!
//! # Override specific settings
//! mudgate --bind 0.0.0.0:4000 --stats-bind 0.0.0.0:4001 --log-level debug
//!
//! # Game port only, JSON logging
//! mudgate --no-stats --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The server shuts down on SIGINT or SIGTERM (Ctrl+C on Windows). A second
//! signal exits immediately.

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Main entry point for the mudgate server.
///
/// Handles the complete application lifecycle including:
/// 1. Command-line argument parsing
/// 2. Configuration loading and validation
/// 3. Logging system initialization
/// 4. Application creation and execution
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
///
/// Note: This function is called from an async context (main with #[tokio::main]),
/// so it should NOT have #[tokio::main] itself.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // A broken file is reported properly by `Application::new` once logging is up.
    let mut logging_settings = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default()
        .logging;
    if let Some(level) = &args.log_level {
        logging_settings.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&logging_settings, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{LoggingSettings, NegotiationSettings, ServerSettings, StatsSettings};
