//! Per-connection handshake state machine.
//!
//! The handshake always walks `Init → AwaitLinemodeReply → AwaitNawsReply →
//! Done`, whatever the client answers. Each receive is bounded by the
//! configured reply timeout, so the whole exchange takes at most two of
//! them.

use super::telnet::{
    is_linemode_refusal, parse_naws_reply, NawsReply, WindowSize, LINE_TERMINATOR,
    REQUEST_LINEMODE, REQUEST_NAWS,
};
use super::{NegotiationError, NegotiationOutcome};
use crate::config::NegotiationConfig;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, trace};

const REPLY_BUFFER_SIZE: usize = 256;

/// Position of a connection in the capability handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Init,
    AwaitLinemodeReply,
    AwaitNawsReply,
    /// Terminal, reached whichever step succeeded
    Done,
}

impl NegotiationState {
    /// The state that follows this one. Transitions never go backwards.
    pub fn next(self) -> Self {
        match self {
            Self::Init => Self::AwaitLinemodeReply,
            Self::AwaitLinemodeReply => Self::AwaitNawsReply,
            Self::AwaitNawsReply | Self::Done => Self::Done,
        }
    }
}

/// Drives the capability handshake on freshly accepted connections.
///
/// The negotiator holds no per-connection state and can be shared between
/// all connection tasks.
#[derive(Debug, Clone)]
pub struct Negotiator {
    config: NegotiationConfig,
}

impl Negotiator {
    pub fn new(config: NegotiationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NegotiationConfig {
        &self.config
    }

    /// Petitions the client for linemode and window-size reporting.
    ///
    /// Never fails: timeouts, refusals, garbage and closed connections all
    /// degrade to a partial or fallback outcome. The stream carries no
    /// timeout afterwards and is ready for normal command processing.
    pub async fn negotiate<S>(&self, stream: &mut S) -> NegotiationOutcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut handshake = Handshake {
            stream,
            reply_timeout: self.config.reply_timeout(),
            state: NegotiationState::Init,
            linemode: false,
            window: None,
        };

        while handshake.state != NegotiationState::Done {
            handshake.advance().await;
        }

        NegotiationOutcome::from_steps(handshake.linemode, handshake.window)
    }
}

struct Handshake<'a, S> {
    stream: &'a mut S,
    reply_timeout: Duration,
    state: NegotiationState,
    linemode: bool,
    window: Option<WindowSize>,
}

impl<S> Handshake<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn advance(&mut self) {
        match self.state {
            NegotiationState::Init => {
                if let Err(e) = self.send(&REQUEST_LINEMODE).await {
                    debug!("Failed to request linemode: {}", e);
                }
            }
            NegotiationState::AwaitLinemodeReply => {
                // Anything but an explicit refusal counts as agreement.
                match self.receive_once().await {
                    Ok(reply) => {
                        debug!("Linemode reply: {:02X?}", reply);
                        self.linemode = !is_linemode_refusal(&reply);
                    }
                    Err(e) => debug!("No usable linemode reply: {}", e),
                }
                if let Err(e) = self.send(&REQUEST_NAWS).await {
                    debug!("Failed to request window size: {}", e);
                }
            }
            NegotiationState::AwaitNawsReply => match self.receive_window_size().await {
                Ok(size) => {
                    debug!("Client window size is {}x{}", size.width, size.height);
                    self.window = Some(size);
                }
                Err(e) => debug!("No usable window-size reply: {}", e),
            },
            NegotiationState::Done => {}
        }

        let next = self.state.next();
        trace!("Negotiation {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    async fn send(&mut self, sequence: &[u8]) -> Result<(), NegotiationError> {
        let mut message = Vec::with_capacity(sequence.len() + LINE_TERMINATOR.len());
        message.extend_from_slice(sequence);
        message.extend_from_slice(LINE_TERMINATOR);

        let limit = self.reply_timeout;
        let stream = &mut *self.stream;
        let write = async move {
            stream.write_all(&message).await?;
            stream.flush().await
        };
        timeout(limit, write)
            .await
            .map_err(|_| NegotiationError::Timeout(limit))??;
        Ok(())
    }

    async fn receive_once(&mut self) -> Result<Vec<u8>, NegotiationError> {
        let limit = self.reply_timeout;
        let mut buf = [0u8; REPLY_BUFFER_SIZE];
        let n = timeout(limit, self.stream.read(&mut buf))
            .await
            .map_err(|_| NegotiationError::Timeout(limit))??;
        if n == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(buf[..n].to_vec())
    }

    /// Reads until a full window-size reply arrived, the reply turned out
    /// malformed, or the step deadline passed.
    async fn receive_window_size(&mut self) -> Result<WindowSize, NegotiationError> {
        let deadline = Instant::now() + self.reply_timeout;
        let mut reply = Vec::new();
        let mut buf = [0u8; REPLY_BUFFER_SIZE];

        loop {
            let n = match timeout_at(deadline, self.stream.read(&mut buf)).await {
                Ok(read) => read?,
                Err(_) if reply.is_empty() => {
                    return Err(NegotiationError::Timeout(self.reply_timeout))
                }
                Err(_) => {
                    return Err(NegotiationError::MalformedResponse(
                        "window-size reply cut off",
                    ))
                }
            };
            if n == 0 {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
            }

            reply.extend_from_slice(&buf[..n]);
            debug!("NAWS reply so far: {:02X?}", reply);

            match parse_naws_reply(&reply) {
                NawsReply::Complete(size) => return Ok(size),
                NawsReply::Malformed(reason) => {
                    return Err(NegotiationError::MalformedResponse(reason))
                }
                NawsReply::Incomplete => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, DuplexStream};

    const LINEMODE_REQUEST: [u8; 5] = [0xFF, 0xFB, 0x22, b'\r', b'\n'];
    const NAWS_REQUEST: [u8; 5] = [0xFF, 0xFD, 0x1F, b'\r', b'\n'];

    fn fast_negotiator() -> Negotiator {
        Negotiator::new(NegotiationConfig {
            reply_timeout_ms: 50,
            default_width: 80,
            default_height: 24,
        })
    }

    async fn expect_request(client: &mut DuplexStream, expected: [u8; 5]) {
        let mut request = [0u8; 5];
        client.read_exact(&mut request).await.unwrap();
        assert_eq!(request, expected);
    }

    #[test]
    fn test_states_only_move_forward() {
        assert_eq!(NegotiationState::Init.next(), NegotiationState::AwaitLinemodeReply);
        assert_eq!(NegotiationState::AwaitLinemodeReply.next(), NegotiationState::AwaitNawsReply);
        assert_eq!(NegotiationState::AwaitNawsReply.next(), NegotiationState::Done);
        assert_eq!(NegotiationState::Done.next(), NegotiationState::Done);
    }

    #[tokio::test]
    async fn test_compliant_client_reports_window_size() {
        let (mut server, mut client) = duplex(1024);

        let client_task = tokio::spawn(async move {
            expect_request(&mut client, LINEMODE_REQUEST).await;
            // IAC DO LINEMODE
            client.write_all(&[0xFF, 0xFD, 0x22]).await.unwrap();
            expect_request(&mut client, NAWS_REQUEST).await;
            client
                .write_all(&[0xFF, 0xFB, 0x1F, 0x00, 0x50, 0x00, 0x19])
                .await
                .unwrap();
            client
        });

        let outcome = fast_negotiator().negotiate(&mut server).await;
        client_task.await.unwrap();

        assert_eq!(outcome, NegotiationOutcome::Success { width: 80, height: 25 });
    }

    #[tokio::test]
    async fn test_silent_client_falls_back() {
        let (mut server, _client) = duplex(1024);
        let started = std::time::Instant::now();

        let outcome = fast_negotiator().negotiate(&mut server).await;

        assert_eq!(outcome, NegotiationOutcome::Fallback);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_timeouts_bound_handshake_to_two_seconds() {
        let (mut server, _client) = duplex(1024);
        let started = Instant::now();

        let outcome = Negotiator::new(NegotiationConfig::default())
            .negotiate(&mut server)
            .await;

        assert_eq!(outcome, NegotiationOutcome::Fallback);
        assert!(started.elapsed() <= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_garbage_replies_keep_default_window() {
        let (mut server, mut client) = duplex(1024);

        let client_task = tokio::spawn(async move {
            expect_request(&mut client, LINEMODE_REQUEST).await;
            client.write_all(b"what?\r\n").await.unwrap();
            expect_request(&mut client, NAWS_REQUEST).await;
            client.write_all(b"what?\r\n").await.unwrap();
            client
        });

        let outcome = fast_negotiator().negotiate(&mut server).await;
        client_task.await.unwrap();

        assert_eq!(
            outcome,
            NegotiationOutcome::PartialSuccess { linemode: true, window: None }
        );
    }

    #[tokio::test]
    async fn test_linemode_refusal_is_not_reported_as_enabled() {
        let (mut server, mut client) = duplex(1024);

        let client_task = tokio::spawn(async move {
            expect_request(&mut client, LINEMODE_REQUEST).await;
            // IAC DONT LINEMODE
            client.write_all(&[0xFF, 0xFE, 0x22]).await.unwrap();
            expect_request(&mut client, NAWS_REQUEST).await;
            client
                .write_all(&[0xFF, 0xFB, 0x1F, 0x00, 0x50, 0x00, 0x19])
                .await
                .unwrap();
            client
        });

        let outcome = fast_negotiator().negotiate(&mut server).await;
        client_task.await.unwrap();

        assert_eq!(
            outcome,
            NegotiationOutcome::PartialSuccess {
                linemode: false,
                window: Some(WindowSize { width: 80, height: 25 }),
            }
        );
    }

    #[tokio::test]
    async fn test_window_size_without_linemode_reply() {
        let (mut server, mut client) = duplex(1024);

        let client_task = tokio::spawn(async move {
            expect_request(&mut client, LINEMODE_REQUEST).await;
            expect_request(&mut client, NAWS_REQUEST).await;
            client
                .write_all(&[0xFF, 0xFB, 0x1F, 0xFF, 0xFA, 0x1F, 0x00, 0x78, 0x00, 0x28, 0xFF, 0xF0])
                .await
                .unwrap();
            client
        });

        let outcome = fast_negotiator().negotiate(&mut server).await;
        client_task.await.unwrap();

        assert_eq!(
            outcome,
            NegotiationOutcome::PartialSuccess {
                linemode: false,
                window: Some(WindowSize { width: 120, height: 40 }),
            }
        );
    }

    #[tokio::test]
    async fn test_split_window_size_reply_is_reassembled() {
        let (mut server, mut client) = duplex(1024);
        let negotiator = Negotiator::new(NegotiationConfig {
            reply_timeout_ms: 500,
            default_width: 80,
            default_height: 24,
        });

        let client_task = tokio::spawn(async move {
            expect_request(&mut client, LINEMODE_REQUEST).await;
            client.write_all(&[0xFF, 0xFD, 0x22]).await.unwrap();
            expect_request(&mut client, NAWS_REQUEST).await;
            client.write_all(&[0xFF, 0xFB, 0x1F, 0x00]).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            client.write_all(&[0x50, 0x00, 0x19]).await.unwrap();
            client
        });

        let outcome = negotiator.negotiate(&mut server).await;
        client_task.await.unwrap();

        assert_eq!(outcome, NegotiationOutcome::Success { width: 80, height: 25 });
    }

    #[tokio::test]
    async fn test_truncated_window_size_reply_falls_back() {
        let (mut server, mut client) = duplex(1024);

        let client_task = tokio::spawn(async move {
            expect_request(&mut client, LINEMODE_REQUEST).await;
            expect_request(&mut client, NAWS_REQUEST).await;
            client.write_all(&[0xFF, 0xFB, 0x1F, 0x00, 0x50]).await.unwrap();
            client
        });

        let outcome = fast_negotiator().negotiate(&mut server).await;
        let _client = client_task.await.unwrap();

        assert_eq!(outcome, NegotiationOutcome::Fallback);
    }

    #[tokio::test]
    async fn test_closed_connection_falls_back() {
        let (mut server, client) = duplex(1024);
        drop(client);

        let outcome = fast_negotiator().negotiate(&mut server).await;

        assert_eq!(outcome, NegotiationOutcome::Fallback);
    }
}
