//! Debug target discovery.
//!
//! This module finds an inspectable page by querying the browser's
//! `/json/list` HTTP endpoint and selecting one target from the list.
//!
//! # Discovery Flow
//!
//! 1. [`fetch_targets`] - `GET {base_url}/json/list`, parse the JSON array
//! 2. [`pick_target`] - filter to page targets, select by id, url
//!    substring, or default heuristic
//!
//! The HTTP exchange is spoken directly over a [`TcpStream`]: the crate
//! deliberately carries no HTTP client, and the single fixed GET the
//! DevTools endpoint requires does not justify one. A discovery failure is
//! terminal for the capture; nothing is retried.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Cap on the discovery response size (8 MiB).
///
/// A browser with hundreds of tabs stays far below this; anything larger
/// is not a DevTools endpoint.
const MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;

/// URL scheme of internal browser pages, skipped by the default heuristic.
const INTERNAL_SCHEME: &str = "devtools://";

/// Blank-page sentinel URL, skipped by the default heuristic.
const BLANK_PAGE: &str = "about:blank";

// ============================================================================
// Target
// ============================================================================

/// One inspectable target from `/json/list`.
///
/// Only the fields the selection logic needs are deserialized; the
/// endpoint sends more (title, favicon, frontend URL) which is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    /// Opaque target identifier.
    #[serde(default)]
    pub id: String,

    /// Target kind: `page`, `iframe`, `service_worker`, ...
    #[serde(rename = "type", default)]
    pub target_type: String,

    /// URL currently loaded in the target.
    #[serde(default)]
    pub url: String,

    /// WebSocket endpoint of the target's debugger.
    ///
    /// Empty when another client is already attached.
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub debugger_ws_url: String,
}

impl Target {
    /// Returns `true` if this target is an attachable page.
    #[inline]
    #[must_use]
    pub fn is_page(&self) -> bool {
        self.target_type == "page" && !self.debugger_ws_url.is_empty()
    }
}

// ============================================================================
// fetch_targets
// ============================================================================

/// Fetches the inspectable target list from `{base_url}/json/list`.
///
/// # Arguments
///
/// * `base_url` - Browser debug base URL, e.g. `http://127.0.0.1:9222`
/// * `deadline` - Bound on the whole HTTP exchange
///
/// # Errors
///
/// - [`Error::Discovery`] on an unusable URL, network failure, non-200
///   status, or a body that is not a JSON target array
/// - [`Error::Timeout`] when the exchange exceeds `deadline`
pub async fn fetch_targets(base_url: &str, deadline: Duration) -> Result<Vec<Target>> {
    let (host, port, path) = parse_base_url(base_url)?;

    debug!(host = %host, port, path = %path, "Fetching target list");

    let body = timeout(deadline, http_get(&host, port, &path))
        .await
        .map_err(|_| Error::timeout("target discovery", deadline.as_millis() as u64))??;

    let targets: Vec<Target> = serde_json::from_slice(&body)
        .map_err(|e| Error::discovery(format!("target list is not a JSON array: {e}")))?;

    debug!(count = targets.len(), "Target list fetched");
    Ok(targets)
}

/// Splits the debug base URL into host, port, and the list request path.
fn parse_base_url(base_url: &str) -> Result<(String, u16, String)> {
    let parsed = Url::parse(base_url)
        .map_err(|e| Error::discovery(format!("invalid browser url {base_url}: {e}")))?;

    if parsed.scheme() != "http" {
        return Err(Error::discovery(format!(
            "browser url must be http, got {}",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| Error::discovery(format!("browser url has no host: {base_url}")))?
        .to_string();
    let port = parsed.port().unwrap_or(80);
    let path = format!("{}/json/list", parsed.path().trim_end_matches('/'));

    Ok((host, port, path))
}

/// Issues one `Connection: close` HTTP GET and returns the response body.
async fn http_get(host: &str, port: u16, path: &str) -> Result<Vec<u8>> {
    let mut stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| Error::discovery(format!("connect to {host}:{port} failed: {e}")))?;

    let request = format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         Accept: application/json\r\n\
         Connection: close\r\n\
         \r\n"
    );
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| Error::discovery(format!("request send failed: {e}")))?;

    // Connection: close makes read-to-EOF well-defined.
    let mut response = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| Error::discovery(format!("response read failed: {e}")))?;
        if n == 0 {
            break;
        }
        response.extend_from_slice(&chunk[..n]);
        if response.len() > MAX_RESPONSE_BYTES {
            return Err(Error::discovery("response exceeds size cap"));
        }
    }

    trace!(bytes = response.len(), "Discovery response received");
    parse_response(&response)
}

/// Splits a raw HTTP response into its body, validating the status line.
fn parse_response(raw: &[u8]) -> Result<Vec<u8>> {
    let header_end = find_header_end(raw)
        .ok_or_else(|| Error::discovery("response has no header terminator"))?;

    let head = String::from_utf8_lossy(&raw[..header_end]);
    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();

    if !status_line_is(status_line, 200) {
        return Err(Error::discovery(format!("unexpected status: {status_line}")));
    }

    let mut content_length: Option<usize> = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        if name == "transfer-encoding" && value.eq_ignore_ascii_case("chunked") {
            // The DevTools endpoint never chunks; a close-delimited read
            // cannot honor this framing.
            return Err(Error::discovery("chunked responses are not supported"));
        }
        if name == "content-length" {
            content_length = value.parse().ok();
        }
    }

    let body = &raw[header_end + 4..];
    let body = match content_length {
        Some(len) if len <= body.len() => &body[..len],
        Some(len) => {
            return Err(Error::discovery(format!(
                "body shorter than Content-Length: {} < {len}",
                body.len()
            )));
        }
        None => body,
    };

    Ok(body.to_vec())
}

/// Locates the `\r\n\r\n` header terminator.
fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Checks an HTTP status line for the given code.
fn status_line_is(line: &str, code: u16) -> bool {
    line.split_whitespace().nth(1) == Some(code.to_string().as_str())
}

// ============================================================================
// pick_target
// ============================================================================

/// Selects one page target from a discovery list.
///
/// Selection order:
///
/// 1. Filter to attachable pages ([`Target::is_page`])
/// 2. `target_id` given: exact id match
/// 3. `url_contains` given: case-insensitive substring on the url, first
///    match in list order
/// 4. Otherwise: first page whose url is non-empty, not `devtools://`,
///    and not `about:blank`; falling back to the first page
///
/// Blank filters (empty or whitespace-only) are treated as absent.
///
/// # Errors
///
/// - [`Error::NoPageTargets`] if no attachable page exists
/// - [`Error::TargetNotFound`] if `target_id` matches nothing
/// - [`Error::NoMatchingTarget`] if `url_contains` matches nothing
pub fn pick_target<'a>(
    targets: &'a [Target],
    target_id: Option<&str>,
    url_contains: Option<&str>,
) -> Result<&'a Target> {
    let pages: Vec<&Target> = targets.iter().filter(|t| t.is_page()).collect();
    if pages.is_empty() {
        return Err(Error::NoPageTargets);
    }

    if let Some(id) = normalize_filter(target_id) {
        return pages
            .iter()
            .find(|t| t.id == id)
            .copied()
            .ok_or_else(|| Error::target_not_found(id));
    }

    if let Some(needle) = normalize_filter(url_contains) {
        let lowered = needle.to_lowercase();
        return pages
            .iter()
            .find(|t| t.url.to_lowercase().contains(&lowered))
            .copied()
            .ok_or_else(|| Error::no_matching_target(needle));
    }

    let picked = pages
        .iter()
        .find(|t| {
            let url = t.url.to_lowercase();
            !url.is_empty() && !url.starts_with(INTERNAL_SCHEME) && url != BLANK_PAGE
        })
        .copied()
        .unwrap_or(pages[0]);

    debug!(id = %picked.id, url = %picked.url, "Target selected");
    Ok(picked)
}

/// Trims a filter, mapping blank to `None`.
fn normalize_filter(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: &str, url: &str) -> Target {
        Target {
            id: id.to_string(),
            target_type: "page".to_string(),
            url: url.to_string(),
            debugger_ws_url: format!("ws://127.0.0.1:9222/devtools/page/{id}"),
        }
    }

    #[test]
    fn test_target_deserialization() {
        let json = r#"{
            "id": "F00D",
            "type": "page",
            "title": "Example",
            "url": "https://example.com/",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/F00D"
        }"#;

        let target: Target = serde_json::from_str(json).expect("parse");
        assert_eq!(target.id, "F00D");
        assert_eq!(target.target_type, "page");
        assert!(target.is_page());
    }

    #[test]
    fn test_target_without_debugger_url_is_not_attachable() {
        let json = r#"{"id": "X", "type": "page", "url": "https://example.com/"}"#;
        let target: Target = serde_json::from_str(json).expect("parse");
        assert!(!target.is_page());
    }

    #[test]
    fn test_pick_default_skips_blank_page() {
        let targets = vec![
            page("t0", "about:blank"),
            page("t1", "https://example.com/product/1"),
        ];

        let picked = pick_target(&targets, None, None).expect("pick");
        assert_eq!(picked.id, "t1");
    }

    #[test]
    fn test_pick_default_skips_devtools_pages() {
        let targets = vec![
            page("t0", "devtools://devtools/bundled/inspector.html"),
            page("t1", "https://shop.example/item"),
        ];

        let picked = pick_target(&targets, None, None).expect("pick");
        assert_eq!(picked.id, "t1");
    }

    #[test]
    fn test_pick_default_falls_back_to_first_page() {
        let targets = vec![page("t0", "about:blank"), page("t1", "")];

        let picked = pick_target(&targets, None, None).expect("pick");
        assert_eq!(picked.id, "t0");
    }

    #[test]
    fn test_pick_by_id() {
        let targets = vec![page("t0", "about:blank"), page("t1", "https://example.com/")];

        let picked = pick_target(&targets, Some("t0"), None).expect("pick");
        assert_eq!(picked.id, "t0");
    }

    #[test]
    fn test_pick_by_missing_id_fails() {
        let targets = vec![page("t0", "about:blank"), page("t1", "https://example.com/")];

        let err = pick_target(&targets, Some("missing"), None).unwrap_err();
        assert!(matches!(err, Error::TargetNotFound { .. }));
    }

    #[test]
    fn test_pick_by_url_substring_case_insensitive() {
        let targets = vec![
            page("t0", "https://example.com/"),
            page("t1", "https://Shop.Example/item/42"),
        ];

        let picked = pick_target(&targets, None, Some("shop.example")).expect("pick");
        assert_eq!(picked.id, "t1");
    }

    #[test]
    fn test_pick_by_url_substring_first_match_wins() {
        let targets = vec![
            page("t0", "https://example.com/a"),
            page("t1", "https://example.com/b"),
        ];

        let picked = pick_target(&targets, None, Some("example.com")).expect("pick");
        assert_eq!(picked.id, "t0");
    }

    #[test]
    fn test_pick_by_url_substring_miss_fails() {
        let targets = vec![
            page("t0", "about:blank"),
            page("t1", "https://example.com/product/1"),
        ];

        let err = pick_target(&targets, None, Some("checkout.example")).unwrap_err();
        assert!(matches!(err, Error::NoMatchingTarget { .. }));
    }

    #[test]
    fn test_pick_with_no_pages_fails() {
        let targets = vec![Target {
            id: "w0".to_string(),
            target_type: "service_worker".to_string(),
            url: "https://example.com/sw.js".to_string(),
            debugger_ws_url: "ws://127.0.0.1:9222/devtools/worker/w0".to_string(),
        }];

        let err = pick_target(&targets, None, None).unwrap_err();
        assert!(matches!(err, Error::NoPageTargets));
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let targets = vec![page("t0", "about:blank"), page("t1", "https://example.com/")];

        let picked = pick_target(&targets, Some("  "), Some("")).expect("pick");
        assert_eq!(picked.id, "t1");
    }

    #[test]
    fn test_parse_response_with_content_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n[]extra";
        let body = parse_response(raw).expect("parse");
        assert_eq!(body, b"[]");
    }

    #[test]
    fn test_parse_response_without_content_length() {
        let raw = b"HTTP/1.1 200 OK\r\n\r\n[{\"id\":\"x\"}]";
        let body = parse_response(raw).expect("parse");
        assert_eq!(body, b"[{\"id\":\"x\"}]");
    }

    #[test]
    fn test_parse_response_rejects_non_200() {
        let raw = b"HTTP/1.1 404 Not Found\r\n\r\n";
        let err = parse_response(raw).unwrap_err();
        assert!(matches!(err, Error::Discovery { .. }));
    }

    #[test]
    fn test_parse_response_rejects_chunked() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\n";
        let err = parse_response(raw).unwrap_err();
        assert!(matches!(err, Error::Discovery { .. }));
    }

    #[test]
    fn test_parse_base_url() {
        let (host, port, path) = parse_base_url("http://127.0.0.1:9222").expect("parse");
        assert_eq!(host, "127.0.0.1");
        assert_eq!(port, 9222);
        assert_eq!(path, "/json/list");
    }

    #[test]
    fn test_parse_base_url_rejects_https() {
        let err = parse_base_url("https://127.0.0.1:9222").unwrap_err();
        assert!(matches!(err, Error::Discovery { .. }));
    }
}
