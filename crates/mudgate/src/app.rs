//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that orchestrates server
//! startup, periodic reporting and shutdown.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, setup_signal_handlers_silent},
};
use mudgate_server::{MudServer, SessionRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How often the running application logs a registry summary.
const SUMMARY_INTERVAL: Duration = Duration::from_secs(60);

/// Main application struct.
///
/// Owns the validated configuration and the bound (not yet started) server.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Bound server, started by [`Application::run`]
    server: MudServer,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    /// 5. Bind the game and stats listeners
    ///
    /// A listener that cannot be bound fails here, before anything runs.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        apply_overrides(&mut config, args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let server = MudServer::bind(config.to_server_config()?)?;

        Ok(Self { config, server })
    }

    /// Runs the server until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        self.log_configuration_summary();

        let game_addr = self.server.local_addr()?;
        let stats_addr = self.server.stats_addr().transpose()?;

        let handle = self.server.start();
        let registry = handle.registry();

        let summary_handle = tokio::spawn(report_registry(registry.clone(), SUMMARY_INTERVAL));

        info!("✅ mudgate is now running!");
        info!("🎮 Accepting telnet clients on {}", game_addr);
        if let Some(addr) = stats_addr {
            info!("📊 Answering stats requests on {}", addr);
        }
        info!("🛑 Press Ctrl+C to shut down");

        setup_signal_handlers().await?;

        // A second signal skips the graceful path.
        tokio::spawn(async move {
            if let Err(e) = setup_signal_handlers_silent().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        summary_handle.abort();

        let uptime = handle.clock().uptime();
        let remaining = registry.len().await;
        handle.shutdown().await;

        info!("📊 Final Statistics:");
        info!("  - Uptime: {:.1}s", uptime.as_secs_f64());
        info!("  - Sessions at shutdown: {}", remaining);
        info!("✅ mudgate shutdown complete");

        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Game address: {}", self.config.server.bind_address);
        if self.config.stats.enabled {
            info!("  📊 Stats address: {}", self.config.stats.bind_address);
        }
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!(
            "  ⏱️ Handshake reply timeout: {}ms",
            self.config.negotiation.reply_timeout_ms
        );
        info!(
            "  🖥️ Default window: {}x{}",
            self.config.negotiation.default_width, self.config.negotiation.default_height
        );
    }
}

/// Applies command-line overrides on top of the file configuration.
fn apply_overrides(config: &mut AppConfig, args: CliArgs) {
    if let Some(bind_address) = args.bind_address {
        config.server.bind_address = bind_address;
    }

    if let Some(stats_bind_address) = args.stats_bind_address {
        config.stats.bind_address = stats_bind_address;
    }

    if args.no_stats {
        config.stats.enabled = false;
    }

    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }

    if args.json_logs {
        config.logging.json_format = true;
    }
}

/// Logs the number of live and named sessions every `every`.
async fn report_registry(registry: Arc<SessionRegistry>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;

        let sessions = registry.len().await;
        let named = registry.player_names().await.len();
        info!(
            "📊 Registry - {} session(s) connected | {} logged in",
            sessions, named
        );
    }
}
