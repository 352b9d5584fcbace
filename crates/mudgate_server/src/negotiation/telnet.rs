//! Telnet option bytes and window-size reply parsing.

use serde::{Deserialize, Serialize};

/// Interpret As Command
pub const IAC: u8 = 0xFF;
pub const WILL: u8 = 0xFB;
pub const WONT: u8 = 0xFC;
pub const DO: u8 = 0xFD;
pub const DONT: u8 = 0xFE;
/// Subnegotiation begin
pub const SB: u8 = 0xFA;
pub const LINEMODE: u8 = 0x22;
/// Negotiate About Window Size
pub const NAWS: u8 = 0x1F;

pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// `IAC WILL LINEMODE`, petitions the client to buffer whole lines.
pub const REQUEST_LINEMODE: [u8; 3] = [IAC, WILL, LINEMODE];

/// `IAC DO NAWS`, asks the client to report its window size.
pub const REQUEST_NAWS: [u8; 3] = [IAC, DO, NAWS];

/// `IAC WILL NAWS`, the client agreeing to report its window size.
pub const NAWS_ACK: [u8; 3] = [IAC, WILL, NAWS];

const NAWS_SUBNEGOTIATION: [u8; 3] = [IAC, SB, NAWS];

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u16,
    pub height: u16,
}

/// Result of inspecting the bytes received so far in reply to `IAC DO NAWS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NawsReply {
    /// The acknowledgment and a full window-size payload were received
    Complete(WindowSize),
    /// The bytes so far are a valid prefix; more are needed
    Incomplete,
    /// The reply can never become a valid acknowledgment
    Malformed(&'static str),
}

/// Whether a reply to the linemode request is an explicit refusal,
/// `IAC DONT LINEMODE` or `IAC WONT LINEMODE`.
pub fn is_linemode_refusal(reply: &[u8]) -> bool {
    reply.starts_with(&[IAC, DONT, LINEMODE]) || reply.starts_with(&[IAC, WONT, LINEMODE])
}

/// Parses a reply to the window-size request.
///
/// The reply must start with `IAC WILL NAWS`. The four payload bytes (width
/// and height, big-endian) either follow as-is, or come inside an
/// `IAC SB NAWS ... IAC SE` subnegotiation where a doubled `IAC` stands for
/// a literal `0xFF`. Anything after the payload is ignored.
pub fn parse_naws_reply(buf: &[u8]) -> NawsReply {
    if buf.len() < NAWS_ACK.len() {
        return if NAWS_ACK.starts_with(buf) {
            NawsReply::Incomplete
        } else {
            NawsReply::Malformed("reply is not IAC WILL NAWS")
        };
    }
    if !buf.starts_with(&NAWS_ACK) {
        return NawsReply::Malformed("reply is not IAC WILL NAWS");
    }

    let rest = &buf[NAWS_ACK.len()..];
    if let Some(escaped) = rest.strip_prefix(&NAWS_SUBNEGOTIATION[..]) {
        return parse_escaped_payload(escaped);
    }
    // `IAC SB` may still turn into a subnegotiation header.
    if rest.len() > 1 && rest.len() < NAWS_SUBNEGOTIATION.len() && NAWS_SUBNEGOTIATION.starts_with(rest) {
        return NawsReply::Incomplete;
    }

    match rest.get(..4) {
        Some(&[w0, w1, h0, h1]) => window_from_payload([w0, w1, h0, h1]),
        _ => NawsReply::Incomplete,
    }
}

fn parse_escaped_payload(escaped: &[u8]) -> NawsReply {
    let mut payload = [0u8; 4];
    let mut filled = 0;
    let mut bytes = escaped.iter().copied();
    while filled < payload.len() {
        let byte = match bytes.next() {
            Some(byte) => byte,
            None => return NawsReply::Incomplete,
        };
        if byte == IAC {
            match bytes.next() {
                Some(IAC) => {}
                Some(_) => return NawsReply::Malformed("window-size payload is truncated"),
                None => return NawsReply::Incomplete,
            }
        }
        payload[filled] = byte;
        filled += 1;
    }
    window_from_payload(payload)
}

fn window_from_payload(payload: [u8; 4]) -> NawsReply {
    let size = WindowSize {
        width: u16::from_be_bytes([payload[0], payload[1]]),
        height: u16::from_be_bytes([payload[2], payload[3]]),
    };
    if size.width == 0 || size.height == 0 {
        return NawsReply::Malformed("window size has a zero dimension");
    }
    NawsReply::Complete(size)
}
