//! Signal handling for graceful server shutdown.
//!
//! SIGINT and SIGTERM are handled on Unix, Ctrl+C on Windows.

use tokio::signal;
use tracing::info;

/// Waits for a termination signal and logs it.
///
/// # Example
///
/// ```rust,no_run
/// use lib_mudgate::signals::setup_signal_handlers;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Start your server...
///
///     setup_signal_handlers().await?;
///
///     // Shut it down...
///     Ok(())
/// }
/// ```
pub async fn setup_signal_handlers() -> Result<(), Box<dyn std::error::Error>> {
    setup_signal_handlers_silent().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    Ok(())
}

/// Waits for a termination signal without logging.
pub async fn setup_signal_handlers_silent() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
