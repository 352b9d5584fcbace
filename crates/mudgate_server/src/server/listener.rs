//! Listening socket construction shared by both acceptors.

use crate::error::ServerError;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket};
use tracing::warn;

/// Pause after a failed accept so a persistent error (e.g. fd exhaustion)
/// does not spin the loop.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Binds a listener with `SO_REUSEADDR` so a restarted server can reclaim
/// its port while old connections linger in `TIME_WAIT`.
///
/// Must be called from within a tokio runtime. Any failure is reported as
/// [`ServerError::Bind`].
pub fn bind_listener(address: SocketAddr, backlog: u32) -> Result<TcpListener, ServerError> {
    let bind_error = |source| ServerError::Bind { address, source };

    let socket = if address.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(bind_error)?;

    socket.set_reuseaddr(true).map_err(bind_error)?;
    socket.bind(address).map_err(bind_error)?;
    socket.listen(backlog).map_err(bind_error)
}

/// Logs a failed accept and waits out [`ACCEPT_ERROR_BACKOFF`].
///
/// Shared by every accept loop. The loop carries on afterwards.
pub async fn back_off_after_accept_error(listener: &str, error: io::Error) {
    warn!("{} listener: {}", listener, ServerError::Accept(error));
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}
