//! Hand-rolled WebSocket transport.
//!
//! This module speaks RFC 6455 directly over a raw TCP socket: upgrade
//! handshake, frame codec, masking, fragmentation, and control-frame
//! handling, with no WebSocket or HTTP client library underneath.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                          ┌──────────────────┐
//! │  ProtocolClient  │        WebSocket         │  Browser         │
//! │                  │◄────────────────────────►│  (DevTools       │
//! │  Connection      │   ws://127.0.0.1:PORT    │   debugger)      │
//! │  Frame codec     │                          │                  │
//! └──────────────────┘                          └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Handshake, frame I/O, message reassembly |
//! | `frame` | Opcodes, masking, frame encoding |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and frame I/O.
pub mod connection;

/// Frame encoding and masking.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use frame::{Frame, Opcode};
