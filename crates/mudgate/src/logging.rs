//! Logging system setup and configuration.
//!
//! Installs the global tracing subscriber with either human-readable or JSON
//! output. A valid `RUST_LOG` takes precedence over the configured level.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initializes the global tracing subscriber.
///
/// `json_format` forces JSON output regardless of the config file.
///
/// # Errors
///
/// Fails if a global subscriber has already been installed.
pub fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(&config.level, rust_log.as_deref());
    let json = json_format || config.json_format;

    tracing_subscriber::registry()
        .with(output_layer(json))
        .with(filter)
        .try_init()?;

    info!(
        "🔧 Logging initialized with level: {} ({} output)",
        config.level,
        if json { "json" } else { "text" }
    );
    Ok(())
}

/// Picks the event filter: `rust_log` when it holds valid directives,
/// otherwise the configured level.
fn build_filter(level: &str, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

/// Formats events with thread ids and names, since every connection
/// handshake runs on its own task.
fn output_layer(json: bool) -> OutputLayer {
    if json {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(true)
            .with_thread_names(true)
            .boxed()
    } else {
        fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(true)
            .with_thread_names(true)
            .boxed()
    }
}

/// Logs the startup banner.
pub fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║               🏰 MUDGATE 🏰              ║");
    info!("║          Telnet front-end v{:<8}      ║", version);
    info!("║                                          ║");
    info!("║  📟 Linemode + window size negotiation   ║");
    info!("║  📋 Shared session registry              ║");
    info!("║  📊 Stats side-channel                   ║");
    info!("╚══════════════════════════════════════════╝");
}
