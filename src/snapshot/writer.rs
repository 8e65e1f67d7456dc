//! Snapshot truncation, persistence, and integrity hashing.
//!
//! The captured HTML passes through two steps: [`maybe_truncate`] bounds
//! it to a byte budget without splitting a UTF-8 sequence, and
//! [`write_html`] persists it (raw or gzip) and hashes what actually
//! landed on disk.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::io::Write as _;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Truncation
// ============================================================================

/// Outcome of bounding content to a byte budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated {
    /// The (possibly shortened) content.
    pub content: String,
    /// Whether anything was cut.
    pub truncated: bool,
    /// UTF-8 byte length before truncation.
    pub original_bytes: usize,
}

/// Bounds `content` to at most `max_bytes` UTF-8 bytes.
///
/// A `max_bytes` of zero means unlimited. When the budget is exceeded the
/// byte sequence is cut at `max_bytes` and any incomplete trailing
/// multi-byte sequence is dropped, so the result is valid UTF-8 of length
/// ≤ `max_bytes`.
#[must_use]
pub fn maybe_truncate(content: &str, max_bytes: usize) -> Truncated {
    let original_bytes = content.len();
    if max_bytes == 0 || original_bytes <= max_bytes {
        return Truncated {
            content: content.to_string(),
            truncated: false,
            original_bytes,
        };
    }

    let cut = &content.as_bytes()[..max_bytes];
    let content = match std::str::from_utf8(cut) {
        Ok(valid) => valid.to_string(),
        // The cut can only split the final character; keep the valid prefix.
        Err(e) => String::from_utf8_lossy(&cut[..e.valid_up_to()]).into_owned(),
    };

    Truncated {
        content,
        truncated: true,
        original_bytes,
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Writes the snapshot and reports on-disk length and SHA-256.
///
/// Creates the destination directory if needed. The content is
/// gzip-compressed when `force_gzip` is set or the path carries a `.gz`
/// suffix, written raw otherwise. After writing, the file is read back
/// and the reported byte count and digest describe the persisted bytes,
/// not the in-memory string, so a partial write or encoding discrepancy
/// cannot go unnoticed.
///
/// # Errors
///
/// Returns [`Error::Write`] with the path attached on any filesystem
/// failure.
pub fn write_html(path: &Path, content: &str, force_gzip: bool) -> Result<(u64, String)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::write(path, &e))?;
    }

    let use_gzip = force_gzip || path.extension().is_some_and(|ext| ext == "gz");
    if use_gzip {
        let file = fs::File::create(path).map_err(|e| Error::write(path, &e))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder
            .write_all(content.as_bytes())
            .map_err(|e| Error::write(path, &e))?;
        encoder.finish().map_err(|e| Error::write(path, &e))?;
    } else {
        fs::write(path, content.as_bytes()).map_err(|e| Error::write(path, &e))?;
    }

    let persisted = fs::read(path).map_err(|e| Error::write(path, &e))?;
    let sha256 = format!("{:x}", Sha256::digest(&persisted));

    debug!(
        path = %path.display(),
        bytes = persisted.len(),
        gzip = use_gzip,
        "Snapshot written"
    );
    Ok((persisted.len() as u64, sha256))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Read as _;

    use flate2::read::GzDecoder;

    #[test]
    fn test_truncate_within_budget_is_identity() {
        let out = maybe_truncate("<html>ok</html>", 100);
        assert_eq!(out.content, "<html>ok</html>");
        assert!(!out.truncated);
        assert_eq!(out.original_bytes, 15);
    }

    #[test]
    fn test_truncate_exact_budget_is_identity() {
        let out = maybe_truncate("<html>ok</html>", 15);
        assert!(!out.truncated);
        assert_eq!(out.content.len(), 15);
    }

    #[test]
    fn test_truncate_zero_budget_is_unlimited() {
        let content = "x".repeat(10_000);
        let out = maybe_truncate(&content, 0);
        assert!(!out.truncated);
        assert_eq!(out.original_bytes, 10_000);
        assert_eq!(out.content, content);
    }

    #[test]
    fn test_truncate_over_budget() {
        let content = "abcdefghij";
        let out = maybe_truncate(content, 4);
        assert_eq!(out.content, "abcd");
        assert!(out.truncated);
        assert_eq!(out.original_bytes, 10);
    }

    #[test]
    fn test_truncate_drops_split_multibyte_sequence() {
        // "é" is two bytes; a 2-byte budget lands mid-character.
        let out = maybe_truncate("aéé", 2);
        assert_eq!(out.content, "a");
        assert!(out.truncated);
        assert_eq!(out.original_bytes, 5);
    }

    #[test]
    fn test_truncate_on_character_boundary() {
        let out = maybe_truncate("aéé", 3);
        assert_eq!(out.content, "aé");
        assert!(out.truncated);
    }

    #[test]
    fn test_write_raw_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.html");
        let content = "<html><body>round trip</body></html>";

        let (bytes, sha256) = write_html(&path, content, false).expect("write");

        let on_disk = std::fs::read(&path).expect("read back");
        assert_eq!(on_disk, content.as_bytes());
        assert_eq!(bytes, content.len() as u64);
        assert_eq!(sha256, format!("{:x}", Sha256::digest(&on_disk)));
        assert_eq!(sha256.len(), 64);
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("deep/nested/out/page.html");

        write_html(&path, "<html></html>", false).expect("write");
        assert!(path.exists());
    }

    #[test]
    fn test_write_gzip_by_suffix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.html.gz");
        let content = "<html>compressed</html>";

        let (bytes, sha256) = write_html(&path, content, false).expect("write");

        let on_disk = std::fs::read(&path).expect("read back");
        assert_eq!(bytes, on_disk.len() as u64);
        assert_eq!(sha256, format!("{:x}", Sha256::digest(&on_disk)));

        let mut decoded = String::new();
        GzDecoder::new(on_disk.as_slice())
            .read_to_string(&mut decoded)
            .expect("gunzip");
        assert_eq!(decoded, content);
    }

    #[test]
    fn test_write_gzip_forced_without_suffix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.html");
        let content = "<html>forced</html>";

        write_html(&path, content, true).expect("write");

        let on_disk = std::fs::read(&path).expect("read back");
        let mut decoded = String::new();
        GzDecoder::new(on_disk.as_slice())
            .read_to_string(&mut decoded)
            .expect("gunzip");
        assert_eq!(decoded, content);
    }

    #[test]
    fn test_write_reports_compressed_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.html.gz");
        let content = "pattern ".repeat(10_000);

        let (bytes, _) = write_html(&path, &content, false).expect("write");
        assert!(bytes < content.len() as u64);
    }
}
