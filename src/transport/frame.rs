//! WebSocket frame encoding.
//!
//! Implements the client side of the RFC 6455 wire format by hand: base
//! header, minimal extended-length encoding, and payload masking. Frame
//! *reading* lives in [`connection`](super::connection), which pulls header
//! fields straight off the socket with exact-size reads; this module owns
//! the shared pieces (opcodes, masking, encoding).
//!
//! # Wire Format
//!
//! ```text
//! 0               1               2               3
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| length (7)  | extended length (16/64, BE)   |
//! |I|S|S|S|  (4)  |A|             | present when length is 126/127|
//! |N|V|V|V|       |S|             |                               |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |    masking key (4 bytes, present when MASK=1)  |   payload    |
//! +------------------------------------------------+--------------+
//! ```
//!
//! Every client-to-server frame is masked; the mask key is fresh random
//! bytes per frame and the payload is XORed byte-wise against it.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// FIN bit in the first header byte.
pub const FIN_BIT: u8 = 0x80;

/// MASK bit in the second header byte.
pub const MASK_BIT: u8 = 0x80;

/// Length escape value signaling a 16-bit extended length.
pub const LEN_U16: u8 = 126;

/// Length escape value signaling a 64-bit extended length.
pub const LEN_U64: u8 = 127;

/// Maximum payload of a control frame (close, ping, pong).
pub const MAX_CONTROL_PAYLOAD: usize = 125;

// ============================================================================
// Opcode
// ============================================================================

/// WebSocket frame opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Continuation of a fragmented message.
    Continuation = 0x0,
    /// UTF-8 text frame.
    Text = 0x1,
    /// Binary frame.
    Binary = 0x2,
    /// Connection close.
    Close = 0x8,
    /// Ping, must be answered with a pong carrying the same payload.
    Ping = 0x9,
    /// Pong.
    Pong = 0xA,
}

impl Opcode {
    /// Decodes the low 4 bits of the first header byte.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for reserved opcode values.
    pub fn from_u4(value: u8) -> Result<Self> {
        match value & 0x0F {
            0x0 => Ok(Self::Continuation),
            0x1 => Ok(Self::Text),
            0x2 => Ok(Self::Binary),
            0x8 => Ok(Self::Close),
            0x9 => Ok(Self::Ping),
            0xA => Ok(Self::Pong),
            other => Err(Error::protocol(format!("reserved frame opcode: {other:#x}"))),
        }
    }

    /// Returns `true` for control opcodes (close, ping, pong).
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }

    /// Returns `true` for data opcodes (text, binary).
    #[inline]
    #[must_use]
    pub const fn is_data(self) -> bool {
        matches!(self, Self::Text | Self::Binary)
    }
}

// ============================================================================
// Masking
// ============================================================================

/// XORs the payload against a 4-byte mask key, in place.
///
/// Masking is an involution: applying the same key twice restores the
/// original bytes, so this serves both directions.
#[inline]
pub fn apply_mask(payload: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// Returns a fresh random 4-byte mask key.
#[must_use]
pub fn random_mask() -> [u8; 4] {
    use rand::Rng;

    rand::rng().random()
}

// ============================================================================
// Frame
// ============================================================================

/// One outgoing WebSocket frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Final frame of its message.
    pub fin: bool,
    /// Frame opcode.
    pub opcode: Opcode,
    /// Unmasked payload bytes.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates an unfragmented text frame.
    #[inline]
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self {
            fin: true,
            opcode: Opcode::Text,
            payload: text.as_bytes().to_vec(),
        }
    }

    /// Creates a control frame, truncating the payload to 125 bytes.
    #[inline]
    #[must_use]
    pub fn control(opcode: Opcode, payload: &[u8]) -> Self {
        let len = payload.len().min(MAX_CONTROL_PAYLOAD);
        Self {
            fin: true,
            opcode,
            payload: payload[..len].to_vec(),
        }
    }

    /// Encodes the frame as masked client-to-server bytes.
    ///
    /// The length field always uses the minimal applicable form: 7-bit
    /// inline, 16-bit at 126 bytes and above, 64-bit at 2^16 and above.
    #[must_use]
    pub fn encode(&self, mask: [u8; 4]) -> Vec<u8> {
        let len = self.payload.len();
        let mut wire = Vec::with_capacity(len + 14);

        let first = if self.fin { FIN_BIT } else { 0 } | self.opcode as u8;
        wire.push(first);

        if len < LEN_U16 as usize {
            wire.push(MASK_BIT | len as u8);
        } else if len <= u16::MAX as usize {
            wire.push(MASK_BIT | LEN_U16);
            wire.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            wire.push(MASK_BIT | LEN_U64);
            wire.extend_from_slice(&(len as u64).to_be_bytes());
        }

        wire.extend_from_slice(&mask);

        let mut masked = self.payload.clone();
        apply_mask(&mut masked, mask);
        wire.extend_from_slice(&masked);

        wire
    }
}

// ============================================================================
// Tests
// ============================================================================
