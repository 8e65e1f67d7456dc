//! WebSocket connection: handshake, frame I/O, message reassembly.
//!
//! One [`Connection`] exclusively owns one TCP socket for the lifetime of
//! one capture. There is no event loop, no correlation map, and no shared
//! state: exactly one command is ever in flight, so frames are read inline
//! by the caller.
//!
//! # Connection Lifecycle
//!
//! 1. [`Connection::connect`] - TCP connect + HTTP/1.1 upgrade handshake
//! 2. [`Connection::send_text`] - one masked, unfragmented text frame out
//! 3. [`Connection::recv_text`] - frame loop in: reassemble fragments,
//!    answer pings transparently, fail on close
//! 4. [`Connection::close`] - best-effort close frame + socket shutdown
//!
//! Every read and write is bounded by the connection deadline; exceeding
//! it fails the capture with [`Error::Timeout`]. A short read (peer went
//! away mid-frame) fails with [`Error::ConnectionClosed`].

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::frame::{self, FIN_BIT, Frame, LEN_U16, LEN_U64, MASK_BIT, Opcode};

// ============================================================================
// Constants
// ============================================================================

/// Cap on the handshake response head (64 KiB).
const MAX_HANDSHAKE_BYTES: usize = 64 * 1024;

/// Cap on a single incoming frame payload (256 MiB).
///
/// A full `outerHTML` of a heavy page stays in the tens of megabytes;
/// anything near this cap is a corrupt length field, not a page.
const MAX_FRAME_PAYLOAD: u64 = 256 * 1024 * 1024;

/// Fixed GUID appended to the key for the `Sec-WebSocket-Accept` check.
const ACCEPT_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

// ============================================================================
// Connection
// ============================================================================

/// An established client WebSocket connection.
///
/// Owns the socket exclusively; dropped (or [`close`](Self::close)d) on
/// every capture exit path.
pub struct Connection {
    /// The upgraded TCP socket.
    stream: TcpStream,
    /// Bytes received past the handshake terminator, served before the
    /// socket on subsequent reads.
    readbuf: Vec<u8>,
    /// Deadline applied to each read and write.
    deadline: Duration,
}

impl Connection {
    /// Connects and performs the WebSocket upgrade handshake.
    ///
    /// # Arguments
    ///
    /// * `ws_url` - Target debugger endpoint, must use the `ws` scheme
    /// * `deadline` - Bound applied to the TCP connect, the handshake, and
    ///   every subsequent read/write on this connection
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedScheme`] for any scheme other than `ws`
    /// - [`Error::HandshakeFailed`] on connect failure, a non-101 status
    ///   line, or a wrong `Sec-WebSocket-Accept` value
    /// - [`Error::Timeout`] when connect or handshake exceeds `deadline`
    pub async fn connect(ws_url: &str, deadline: Duration) -> Result<Self> {
        let parsed = Url::parse(ws_url)
            .map_err(|e| Error::handshake_failed(format!("invalid websocket url {ws_url}: {e}")))?;

        if parsed.scheme() != "ws" {
            return Err(Error::unsupported_scheme(parsed.scheme()));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| Error::handshake_failed(format!("websocket url has no host: {ws_url}")))?
            .to_string();
        let port = parsed.port().unwrap_or(80);
        let path = match parsed.query() {
            Some(query) => format!("{}?{query}", parsed.path()),
            None => parsed.path().to_string(),
        };

        debug!(host = %host, port, path = %path, "Connecting to debugger endpoint");

        let deadline_ms = deadline.as_millis() as u64;
        let stream = timeout(deadline, TcpStream::connect((host.as_str(), port)))
            .await
            .map_err(|_| Error::timeout("tcp connect", deadline_ms))?
            .map_err(|e| Error::handshake_failed(format!("connect to {host}:{port} failed: {e}")))?;

        let mut conn = Self {
            stream,
            readbuf: Vec::new(),
            deadline,
        };
        conn.handshake(&host, port, &path).await?;

        debug!("WebSocket handshake completed");
        Ok(conn)
    }

    /// Sends the upgrade request and validates the response head.
    async fn handshake(&mut self, host: &str, port: u16, path: &str) -> Result<()> {
        let key = BASE64.encode(random_key_bytes());
        let request = build_upgrade_request(host, port, path, &key);

        self.write_all_timed(request.as_bytes(), "handshake send")
            .await?;

        // Read until the header terminator or the cap, whichever first.
        let mut response = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            if let Some(pos) = find_header_end(&response) {
                break pos;
            }
            if response.len() > MAX_HANDSHAKE_BYTES {
                return Err(Error::handshake_failed("response head exceeds 64KiB cap"));
            }

            let n = timeout(self.deadline, self.stream.read(&mut chunk))
                .await
                .map_err(|_| Error::timeout("handshake read", self.deadline_ms()))??;
            if n == 0 {
                return Err(Error::handshake_failed(
                    "peer closed before completing handshake",
                ));
            }
            response.extend_from_slice(&chunk[..n]);
        };

        // Anything past the terminator is already frame data.
        self.readbuf = response.split_off(header_end + 4);
        response.truncate(header_end);

        let head = String::from_utf8_lossy(&response);
        validate_upgrade_response(&head, &key)
    }

    /// Sends one unfragmented masked text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the write exceeds the deadline
    /// - [`Error::Io`] on socket failure
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        let wire = Frame::text(text).encode(frame::random_mask());
        trace!(bytes = wire.len(), "Sending text frame");
        self.write_all_timed(&wire, "frame send").await
    }

    /// Sends a masked control frame, truncating the payload to 125 bytes.
    pub async fn send_control(&mut self, opcode: Opcode, payload: &[u8]) -> Result<()> {
        let wire = Frame::control(opcode, payload).encode(frame::random_mask());
        self.write_all_timed(&wire, "control send").await
    }

    /// Receives one complete text message, reassembling fragments.
    ///
    /// Control frames interleaved with the message are handled
    /// transparently: pings are answered with an identical-payload pong,
    /// pongs are ignored, a close frame fails the receive. The assembled
    /// payload is decoded leniently as UTF-8.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] on a close frame or short read
    /// - [`Error::Timeout`] if any frame read exceeds the deadline
    /// - [`Error::Protocol`] on malformed framing
    pub async fn recv_text(&mut self) -> Result<String> {
        let mut message: Vec<u8> = Vec::new();
        let mut in_progress = false;

        loop {
            let (fin, opcode, payload) = self.read_frame().await?;

            match opcode {
                Opcode::Close => {
                    debug!("Close frame received");
                    return Err(Error::ConnectionClosed);
                }
                Opcode::Ping => {
                    trace!(bytes = payload.len(), "Ping received, replying pong");
                    self.send_control(Opcode::Pong, &payload).await?;
                }
                Opcode::Pong => {
                    trace!("Unsolicited pong ignored");
                }
                Opcode::Text | Opcode::Binary => {
                    if in_progress {
                        return Err(Error::protocol("data frame inside fragmented message"));
                    }
                    message.extend_from_slice(&payload);
                    if fin {
                        break;
                    }
                    in_progress = true;
                }
                Opcode::Continuation => {
                    if !in_progress {
                        return Err(Error::protocol("continuation frame without a message"));
                    }
                    message.extend_from_slice(&payload);
                    if fin {
                        break;
                    }
                }
            }
        }

        Ok(String::from_utf8_lossy(&message).into_owned())
    }

    /// Best-effort teardown: close frame, then socket shutdown.
    ///
    /// Failures here are logged and swallowed; they never supersede the
    /// primary capture outcome.
    pub async fn close(&mut self) {
        if let Err(e) = self.send_control(Opcode::Close, &[]).await {
            warn!(error = %e, "Close frame send failed");
        }
        if let Err(e) = self.stream.shutdown().await {
            trace!(error = %e, "Socket shutdown failed");
        }
    }

    // ========================================================================
    // Frame reading
    // ========================================================================

    /// Reads one frame: base header, extended length, mask key, payload.
    async fn read_frame(&mut self) -> Result<(bool, Opcode, Vec<u8>)> {
        let header = self.read_exact(2).await?;
        let fin = header[0] & FIN_BIT != 0;
        let opcode = Opcode::from_u4(header[0])?;
        let masked = header[1] & MASK_BIT != 0;

        let len = match header[1] & 0x7F {
            LEN_U16 => {
                let ext = self.read_exact(2).await?;
                u64::from(u16::from_be_bytes([ext[0], ext[1]]))
            }
            LEN_U64 => {
                let ext = self.read_exact(8).await?;
                u64::from_be_bytes([
                    ext[0], ext[1], ext[2], ext[3], ext[4], ext[5], ext[6], ext[7],
                ])
            }
            inline => u64::from(inline),
        };
        if len > MAX_FRAME_PAYLOAD {
            return Err(Error::protocol(format!("frame payload too large: {len}")));
        }

        // Servers do not normally mask, but tolerate it if they do.
        let mask = if masked {
            let key = self.read_exact(4).await?;
            Some([key[0], key[1], key[2], key[3]])
        } else {
            None
        };

        let mut payload = self.read_exact(len as usize).await?;
        if let Some(mask) = mask {
            frame::apply_mask(&mut payload, mask);
        }

        trace!(?opcode, fin, bytes = payload.len(), "Frame received");
        Ok((fin, opcode, payload))
    }

    /// Reads exactly `n` bytes, draining the handshake leftover first.
    async fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);

        if !self.readbuf.is_empty() {
            let take = n.min(self.readbuf.len());
            out.extend(self.readbuf.drain(..take));
        }

        while out.len() < n {
            let mut rest = vec![0u8; n - out.len()];
            let read = timeout(self.deadline, self.stream.read(&mut rest))
                .await
                .map_err(|_| Error::timeout("frame read", self.deadline_ms()))??;
            if read == 0 {
                return Err(Error::ConnectionClosed);
            }
            out.extend_from_slice(&rest[..read]);
        }

        Ok(out)
    }

    /// Writes a full buffer under the connection deadline.
    async fn write_all_timed(&mut self, bytes: &[u8], operation: &str) -> Result<()> {
        timeout(self.deadline, self.stream.write_all(bytes))
            .await
            .map_err(|_| Error::timeout(operation, self.deadline_ms()))??;
        Ok(())
    }

    #[inline]
    fn deadline_ms(&self) -> u64 {
        self.deadline.as_millis() as u64
    }
}

// ============================================================================
// Handshake helpers
// ============================================================================

/// Returns 16 fresh random bytes for the `Sec-WebSocket-Key`.
fn random_key_bytes() -> [u8; 16] {
    use rand::Rng;

    rand::rng().random()
}

/// Builds the HTTP/1.1 upgrade request head.
fn build_upgrade_request(host: &str, port: u16, path: &str, key: &str) -> String {
    format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n"
    )
}

/// Computes the expected `Sec-WebSocket-Accept` for a sent key.
fn expected_accept(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(ACCEPT_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Validates the handshake response head.
///
/// The status line must signal `101 Switching Protocols`. When the server
/// echoes a `Sec-WebSocket-Accept` header it must match the sent key; a
/// missing header is tolerated for the sake of minimal debugger endpoints
/// that skip it.
fn validate_upgrade_response(head: &str, key: &str) -> Result<()> {
    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();

    let is_switch = status_line.starts_with("HTTP/1.1 101") || status_line.contains(" 101 ");
    if !is_switch {
        return Err(Error::handshake_failed(format!(
            "status line: {status_line}"
        )));
    }

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("sec-websocket-accept") {
            let value = value.trim();
            let expected = expected_accept(key);
            if value != expected {
                return Err(Error::handshake_failed(format!(
                    "Sec-WebSocket-Accept mismatch: got {value}, expected {expected}"
                )));
            }
        }
    }

    Ok(())
}

/// Locates the `\r\n\r\n` header terminator.
fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n")
}

// ============================================================================
// Tests
// ============================================================================
