//! Single-exchange protocol client.
//!
//! Runs one evaluate command against one debugger endpoint: connect, send,
//! correlate the matching response, tear down. There is no correlation
//! map and no event subscription; anything on the wire that does not
//! answer the sent command is discarded by design.
//!
//! Lifecycle: `Disconnected → Connecting → Connected → AwaitingResponse →
//! Closing → Closed`, with every failure terminal for the capture.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::Result;
use crate::transport::Connection;

use super::Command;
use super::message::Response;

// ============================================================================
// Constants
// ============================================================================

/// The one command id this client ever uses.
///
/// One command in flight per connection lifetime makes a counter
/// pointless; the peer echoes this value back.
const COMMAND_ID: u64 = 1;

// ============================================================================
// evaluate
// ============================================================================

/// Evaluates a script expression in the page behind `ws_url`.
///
/// Opens a transport, sends one `Runtime.evaluate` command, and loops
/// receiving messages until the one answering the command arrives;
/// asynchronous protocol traffic with a different (or absent) id is
/// dropped. On every exit path, success or failure, a close frame is
/// attempted and the socket shut down; teardown failures never override
/// the primary outcome.
///
/// The returned value has dynamic JSON type; the caller asserts the type
/// it expects.
///
/// # Errors
///
/// - [`Error::Protocol`](crate::Error::Protocol) when the response
///   carries an `error` payload
/// - [`Error::EvaluationException`](crate::Error::EvaluationException)
///   when the expression threw in the page
/// - Transport errors from connect, handshake, or frame I/O
pub async fn evaluate(ws_url: &str, expression: &str, deadline: Duration) -> Result<Value> {
    let mut conn = Connection::connect(ws_url, deadline).await?;
    let outcome = run_exchange(&mut conn, expression).await;
    conn.close().await;
    outcome
}

/// The command/response exchange on an established connection.
async fn run_exchange(conn: &mut Connection, expression: &str) -> Result<Value> {
    let command = Command::evaluate(COMMAND_ID, expression);
    let payload = serde_json::to_string(&command)?;

    debug!(id = COMMAND_ID, "Sending evaluate command");
    conn.send_text(&payload).await?;

    loop {
        let text = conn.recv_text().await?;
        let message: Response = serde_json::from_str(&text)?;

        if !message.is_for(COMMAND_ID) {
            trace!(id = ?message.id, "Discarding unrelated message");
            continue;
        }

        debug!("Matching response received");
        return message.into_value();
    }
}
