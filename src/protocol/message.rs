//! Command and Response message types.
//!
//! Defines the JSON payloads exchanged with the DevTools debugger over
//! text frames: one evaluate command out, correlated responses in.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Command
// ============================================================================

/// A command from client to debugger.
///
/// # Format
///
/// ```json
/// {
///   "id": 1,
///   "method": "Runtime.evaluate",
///   "params": { ... }
/// }
/// ```
///
/// The `id` is client-chosen and echoed exactly by the peer; this client
/// keeps a single command in flight per connection lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    /// Identifier for response correlation, positive.
    pub id: u64,

    /// Protocol method, `domain.operation`.
    pub method: String,

    /// Method parameters.
    pub params: EvaluateParams,
}

impl Command {
    /// Creates a `Runtime.evaluate` command returning the value by value.
    #[inline]
    #[must_use]
    pub fn evaluate(id: u64, expression: impl Into<String>) -> Self {
        Self {
            id,
            method: "Runtime.evaluate".to_string(),
            params: EvaluateParams {
                expression: expression.into(),
                return_by_value: true,
                await_promise: false,
            },
        }
    }
}

// ============================================================================
// EvaluateParams
// ============================================================================

/// Parameters of `Runtime.evaluate`.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateParams {
    /// Script expression evaluated in the page.
    pub expression: String,

    /// Ask the debugger to serialize the result value instead of
    /// returning a remote object handle.
    #[serde(rename = "returnByValue")]
    pub return_by_value: bool,

    /// Resolve promises before answering; this client evaluates only
    /// synchronous expressions.
    #[serde(rename = "awaitPromise")]
    pub await_promise: bool,
}

// ============================================================================
// Response
// ============================================================================

/// A message from the debugger.
///
/// # Format
///
/// Success:
/// ```json
/// {"id": 1, "result": {"result": {"value": "<html>...</html>"}}}
/// ```
///
/// Exception:
/// ```json
/// {"id": 1, "result": {"result": {...}, "exceptionDetails": {...}}}
/// ```
///
/// Error:
/// ```json
/// {"id": 1, "error": {"code": -32000, "message": "..."}}
/// ```
///
/// Asynchronous protocol events carry a `method` and no `id`; they
/// deserialize with `id: None` and are discarded by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the command `id`; absent on events.
    #[serde(default)]
    pub id: Option<u64>,

    /// Error payload (if the command failed at the protocol level).
    #[serde(default)]
    pub error: Option<Value>,

    /// Evaluate result (if the command succeeded).
    #[serde(default)]
    pub result: Option<EvaluateResult>,
}

impl Response {
    /// Returns `true` if this message answers the given command id.
    #[inline]
    #[must_use]
    pub fn is_for(&self, id: u64) -> bool {
        self.id == Some(id)
    }

    /// Extracts the evaluated value.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the response carries an `error` payload
    /// - [`Error::EvaluationException`] if the script threw in the page
    pub fn into_value(self) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(Error::protocol(error.to_string()));
        }

        let result = self.result.unwrap_or_default();
        if let Some(details) = result.exception_details {
            return Err(Error::evaluation_exception(details.to_string()));
        }

        Ok(result
            .result
            .and_then(|object| object.value)
            .unwrap_or(Value::Null))
    }
}

// ============================================================================
// EvaluateResult
// ============================================================================

/// The `result` object of an evaluate response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluateResult {
    /// Serialized result value wrapper.
    #[serde(default)]
    pub result: Option<RemoteObject>,

    /// Present when the evaluated expression threw.
    #[serde(rename = "exceptionDetails", default)]
    pub exception_details: Option<Value>,
}

/// A by-value serialized remote object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteObject {
    /// The serialized value; absent for `undefined`.
    #[serde(default)]
    pub value: Option<Value>,
}

// ============================================================================
// Tests
// ============================================================================
