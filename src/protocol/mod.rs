//! DevTools protocol messages and client.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Command` | Client → Debugger | One evaluate request |
//! | `Response` | Debugger → Client | Command response, correlated by id |
//!
//! Commands follow the `domain.operation` naming of the remote-debugging
//! protocol; the only operation this crate issues is `Runtime.evaluate`.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | Single command/response exchange |
//! | `message` | Command and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Single-exchange protocol client.
pub mod client;

/// Command and Response message types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::evaluate;
pub use message::{Command, EvaluateParams, EvaluateResult, RemoteObject, Response};
