//! Error types for CDP snapshot capture.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use cdp_snapshot::{CaptureOptions, Result, capture_snapshot};
//!
//! async fn example() -> Result<()> {
//!     let result =
//!         capture_snapshot(CaptureOptions::new("http://127.0.0.1:9222", "out/page.html")).await?;
//!     println!("sha256: {}", result.sha256);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Discovery | [`Error::Discovery`], [`Error::NoPageTargets`], [`Error::TargetNotFound`], [`Error::NoMatchingTarget`] |
//! | Transport | [`Error::UnsupportedScheme`], [`Error::HandshakeFailed`], [`Error::ConnectionClosed`], [`Error::Timeout`] |
//! | Protocol | [`Error::Protocol`], [`Error::EvaluationException`] |
//! | Persistence | [`Error::Write`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging. Every variant is
/// terminal for a single capture attempt; nothing here is retried internally.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Discovery Errors
    // ========================================================================
    /// Target discovery failed.
    ///
    /// Returned when the `/json/list` endpoint cannot be reached or its
    /// body is not a JSON target list.
    #[error("Discovery failed: {message}")]
    Discovery {
        /// Description of the discovery failure.
        message: String,
    },

    /// No eligible page targets.
    ///
    /// Returned when the target list contains no entry with type `page`
    /// and a non-empty `webSocketDebuggerUrl`.
    #[error("No page targets with webSocketDebuggerUrl found")]
    NoPageTargets,

    /// Requested target id not present.
    ///
    /// Returned when an explicit target id matches no page target.
    #[error("Target id not found: {target_id}")]
    TargetNotFound {
        /// The id that was requested.
        target_id: String,
    },

    /// URL substring filter matched nothing.
    #[error("No page target url contains: {needle}")]
    NoMatchingTarget {
        /// The substring that was searched for.
        needle: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// WebSocket URL uses an unsupported scheme.
    ///
    /// Only plain `ws://` is spoken; DevTools exposes its debugger socket
    /// unencrypted on localhost.
    #[error("Unsupported websocket scheme: {scheme}")]
    UnsupportedScheme {
        /// The scheme that was rejected.
        scheme: String,
    },

    /// WebSocket upgrade handshake failed.
    ///
    /// Returned when the server does not answer `101 Switching Protocols`
    /// or answers with a wrong `Sec-WebSocket-Accept` value.
    #[error("WebSocket handshake failed: {message}")]
    HandshakeFailed {
        /// Description of the handshake failure.
        message: String,
    },

    /// Connection closed by the peer.
    ///
    /// Returned on a close frame or a short read mid-frame.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation timeout.
    ///
    /// Returned when any bounded I/O operation exceeds its deadline.
    /// Aborts the entire capture; there is no partial-result state.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol-level error response or violation.
    ///
    /// Returned when the matching response carries an `error` field, or
    /// when the peer sends something the protocol does not allow.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol error.
        message: String,
    },

    /// Script evaluation threw in the page.
    ///
    /// Returned when the evaluate result carries `exceptionDetails`.
    #[error("Runtime exception: {details}")]
    EvaluationException {
        /// The exception details payload, serialized.
        details: String,
    },

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// Snapshot could not be persisted.
    #[error("Write failed for {path}: {message}")]
    Write {
        /// Destination path of the failed write.
        path: PathBuf,
        /// Description of the write failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a discovery error.
    #[inline]
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Creates a target-not-found error.
    #[inline]
    pub fn target_not_found(target_id: impl Into<String>) -> Self {
        Self::TargetNotFound {
            target_id: target_id.into(),
        }
    }

    /// Creates a no-matching-target error.
    #[inline]
    pub fn no_matching_target(needle: impl Into<String>) -> Self {
        Self::NoMatchingTarget {
            needle: needle.into(),
        }
    }

    /// Creates an unsupported-scheme error.
    #[inline]
    pub fn unsupported_scheme(scheme: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
        }
    }

    /// Creates a handshake failure error.
    #[inline]
    pub fn handshake_failed(message: impl Into<String>) -> Self {
        Self::HandshakeFailed {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an evaluation exception error.
    #[inline]
    pub fn evaluation_exception(details: impl Into<String>) -> Self {
        Self::EvaluationException {
            details: details.into(),
        }
    }

    /// Creates a write error.
    #[inline]
    pub fn write(path: impl Into<PathBuf>, err: &IoError) -> Self {
        Self::Write {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is a discovery error.
    #[inline]
    #[must_use]
    pub fn is_discovery_error(&self) -> bool {
        matches!(
            self,
            Self::Discovery { .. }
                | Self::NoPageTargets
                | Self::TargetNotFound { .. }
                | Self::NoMatchingTarget { .. }
        )
    }

    /// Returns `true` if this is a connection-level error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedScheme { .. }
                | Self::HandshakeFailed { .. }
                | Self::ConnectionClosed
                | Self::Timeout { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::handshake_failed("status line: HTTP/1.1 400 Bad Request");
        assert_eq!(
            err.to_string(),
            "WebSocket handshake failed: status line: HTTP/1.1 400 Bad Request"
        );
    }

    #[test]
    fn test_target_not_found_display() {
        let err = Error::target_not_found("abc123");
        assert_eq!(err.to_string(), "Target id not found: abc123");
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::timeout("frame read", 5000);
        let other_err = Error::ConnectionClosed;

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_discovery_error() {
        assert!(Error::NoPageTargets.is_discovery_error());
        assert!(Error::discovery("connection refused").is_discovery_error());
        assert!(Error::no_matching_target("shop").is_discovery_error());
        assert!(!Error::ConnectionClosed.is_discovery_error());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::unsupported_scheme("wss").is_connection_error());
        assert!(Error::handshake_failed("no 101").is_connection_error());
        assert!(!Error::NoPageTargets.is_connection_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_write_error_carries_path() {
        let io_err = IoError::new(ErrorKind::PermissionDenied, "denied");
        let err = Error::write("/tmp/out.html", &io_err);
        assert!(err.to_string().contains("/tmp/out.html"));
    }
}
