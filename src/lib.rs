//! CDP Snapshot - capture rendered page HTML over the DevTools protocol.
//!
//! This library attaches to a running browser's remote-debug endpoint and
//! captures the live `outerHTML` of one tab, speaking the protocol
//! directly over a raw TCP socket: the discovery HTTP GET, the WebSocket
//! upgrade handshake, and the frame codec (masking, extended lengths,
//! control frames, fragmentation) are all implemented by hand, with no
//! HTTP or WebSocket client library.
//!
//! # Architecture
//!
//! One capture is a straight pipeline:
//!
//! - **Discovery**: `GET /json/list`, select a page target
//! - **Transport**: TCP connect + upgrade handshake + hand-rolled frames
//! - **Protocol**: one `Runtime.evaluate` command/response exchange
//! - **Writer**: bound to a byte budget, persist (raw or gzip), hash
//!
//! Key design principles:
//!
//! - One connection, one in-flight command, no event subscriptions
//! - Every blocking step bounded by an explicit timeout
//! - The reported size and digest describe the bytes on disk
//! - No internal retry; a failed capture is safe to re-invoke whole
//!
//! # Quick Start
//!
//! ```no_run
//! use cdp_snapshot::{CaptureOptions, Result, capture_snapshot};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let options = CaptureOptions::new("http://127.0.0.1:9222", "out/page.html")
//!         .url_contains("example.com")
//!         .max_bytes(5_000_000);
//!
//!     let result = capture_snapshot(options).await?;
//!     println!("{} bytes, sha256 {}", result.bytes_written, result.sha256);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`discovery`] | Target list fetch and selection |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Command/response types and the evaluate client |
//! | [`snapshot`] | Capture orchestration and persistence |
//! | [`transport`] | Hand-rolled WebSocket transport |

// ============================================================================
// Modules
// ============================================================================

/// Debug target discovery and selection.
pub mod discovery;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// DevTools protocol messages and the single-exchange client.
pub mod protocol;

/// Snapshot capture orchestration, truncation, and persistence.
pub mod snapshot;

/// Hand-rolled WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Discovery types
pub use discovery::{Target, fetch_targets, pick_target};

// Error types
pub use error::{Error, Result};

// Protocol operations
pub use protocol::evaluate;

// Snapshot types
pub use snapshot::writer::{Truncated, maybe_truncate, write_html};
pub use snapshot::{CaptureOptions, OUTER_HTML_EXPRESSION, SnapshotResult, capture_snapshot};

// Transport types
pub use transport::{Connection, Frame, Opcode};
