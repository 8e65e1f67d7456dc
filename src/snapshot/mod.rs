//! Snapshot capture orchestration.
//!
//! Composes the leaf components into one capture:
//! discover → select target → evaluate → truncate → write → report.
//!
//! A capture is single-shot: no retry, no partial result, safe to repeat.
//! Concurrent captures from separate processes are fine as long as they
//! attach to different tabs.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `writer` | Truncation, persistence, integrity hashing |

// ============================================================================
// Submodules
// ============================================================================

/// Truncation, persistence, and integrity hashing.
pub mod writer;

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::discovery;
use crate::error::{Error, Result};
use crate::protocol;

// ============================================================================
// Constants
// ============================================================================

/// Expression serializing the page's root element markup.
///
/// Guards against documents without a root element (e.g. a tab that has
/// not committed a navigation yet), which evaluate to an empty string.
pub const OUTER_HTML_EXPRESSION: &str =
    "document.documentElement ? document.documentElement.outerHTML : ''";

/// Default bound on connect, handshake, and every frame read/write.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

// ============================================================================
// CaptureOptions
// ============================================================================

/// Configuration for one snapshot capture.
///
/// # Example
///
/// ```ignore
/// use cdp_snapshot::CaptureOptions;
///
/// let options = CaptureOptions::new("http://127.0.0.1:9222", "out/page.html.gz")
///     .url_contains("example.com")
///     .max_bytes(5_000_000);
/// ```
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Browser remote-debug base URL.
    pub browser_url: String,
    /// Destination path; a `.gz` suffix implies gzip.
    pub output: PathBuf,
    /// Exact target id filter.
    pub target_id: Option<String>,
    /// Case-insensitive target url substring filter.
    pub url_contains: Option<String>,
    /// UTF-8 byte cap on the captured HTML; 0 = unlimited.
    pub max_bytes: usize,
    /// Force gzip regardless of the output suffix.
    pub gzip: bool,
    /// Bound on every blocking step of the capture.
    pub timeout: Duration,
}

impl CaptureOptions {
    /// Creates options with default filters, unlimited size, 20s timeout.
    #[must_use]
    pub fn new(browser_url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            browser_url: browser_url.into(),
            output: output.into(),
            target_id: None,
            url_contains: None,
            max_bytes: 0,
            gzip: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Selects a target by exact id.
    #[must_use]
    pub fn target_id(mut self, id: impl Into<String>) -> Self {
        self.target_id = Some(id.into());
        self
    }

    /// Selects the first target whose url contains `needle`.
    #[must_use]
    pub fn url_contains(mut self, needle: impl Into<String>) -> Self {
        self.url_contains = Some(needle.into());
        self
    }

    /// Caps the captured HTML at `max_bytes` UTF-8 bytes (0 = unlimited).
    #[must_use]
    pub const fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Forces gzip output regardless of the path suffix.
    #[must_use]
    pub const fn gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Sets the per-operation timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// SnapshotResult
// ============================================================================

/// The outcome of one successful capture. Immutable after creation.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotResult {
    /// Id of the captured target.
    pub target_id: String,
    /// URL the target had at capture time.
    pub target_url: String,
    /// Where the snapshot was written.
    pub output_path: PathBuf,
    /// On-disk size of the persisted artifact.
    pub bytes_written: u64,
    /// SHA-256 of the persisted bytes, 64 hex chars.
    pub sha256: String,
    /// UTC capture time, second precision.
    pub captured_at: String,
    /// Whether the HTML was cut to the byte budget.
    pub truncated: bool,
    /// UTF-8 byte length before truncation.
    pub original_bytes: usize,
}

impl SnapshotResult {
    /// Renders the one-line success report emitted by the CLI.
    #[must_use]
    pub fn report(&self) -> Value {
        json!({
            "status": "ok",
            "captured_at": self.captured_at,
            "target_id": self.target_id,
            "target_url": self.target_url,
            "output": self.output_path,
            "bytes": self.bytes_written,
            "sha256": self.sha256,
            "truncated": self.truncated,
            "original_bytes": self.original_bytes,
        })
    }
}

// ============================================================================
// capture_snapshot
// ============================================================================

/// Captures the rendered HTML of one browser tab.
///
/// Discovers targets, selects one, evaluates
/// [`OUTER_HTML_EXPRESSION`] over a fresh WebSocket connection, bounds
/// the result to the byte budget, persists it, and reports what landed
/// on disk.
///
/// # Errors
///
/// Any discovery, transport, protocol, or persistence error; all are
/// terminal for this attempt and safe to retry by calling again.
pub async fn capture_snapshot(options: CaptureOptions) -> Result<SnapshotResult> {
    let targets = discovery::fetch_targets(&options.browser_url, options.timeout).await?;
    let target = discovery::pick_target(
        &targets,
        options.target_id.as_deref(),
        options.url_contains.as_deref(),
    )?
    .clone();

    debug!(id = %target.id, url = %target.url, "Capturing snapshot");

    let value =
        protocol::evaluate(&target.debugger_ws_url, OUTER_HTML_EXPRESSION, options.timeout).await?;
    let html = value
        .as_str()
        .ok_or_else(|| Error::protocol("Runtime.evaluate did not return an html string"))?;

    let bounded = writer::maybe_truncate(html, options.max_bytes);
    let (bytes_written, sha256) = writer::write_html(&options.output, &bounded.content, options.gzip)?;

    let result = SnapshotResult {
        target_id: target.id,
        target_url: target.url,
        output_path: options.output,
        bytes_written,
        sha256,
        captured_at: utc_now_second(),
        truncated: bounded.truncated,
        original_bytes: bounded.original_bytes,
    };

    info!(
        target_id = %result.target_id,
        bytes = result.bytes_written,
        truncated = result.truncated,
        "Snapshot captured"
    );
    Ok(result)
}

/// UTC now at second precision, `YYYY-MM-DDTHH:MM:SSZ`.
fn utc_now_second() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ============================================================================
// Tests
// ============================================================================
