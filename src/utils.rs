//! Small helpers for logging, date display and output directories.

use chrono::{DateTime, Utc};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Truncate a string for logging purposes.
///
/// Strings longer than `max` bytes are cut at the nearest char boundary
/// below `max` and get `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// A response body cut off mid-transfer fails with an EOF error rather
/// than a syntax error.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Human-readable form of an upstream ISO-8601 timestamp.
///
/// Anything that does not parse as RFC 3339 is returned unchanged.
pub fn display_date(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc).format("%d %b %Y, %H:%M UTC").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Create the snapshot directory if needed and check that files can be
/// written into it, so a bad path fails before the upstream call is spent.
#[instrument(level = "info", skip_all, fields(path = %dir.display()))]
pub async fn ensure_writable_dir(dir: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir).await?;
    let marker = dir.join(concat!(".", env!("CARGO_PKG_NAME"), "-write-check"));
    fs::write(&marker, b"").await?;
    if let Err(e) = fs::remove_file(&marker).await {
        warn!(path = %marker.display(), error = %e, "Could not remove write-check file");
    }
    info!("Snapshot directory is writable");
    Ok(())
}
