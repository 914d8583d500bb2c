//! JSON snapshot of a [`NewsPage`].
//!
//! Used by the one-shot mode (`--json-output-dir`). Snapshots are grouped
//! by the UTC date they were generated on:
//!
//! ```text
//! json_output_dir/
//! └── 2026-01-19/
//!     ├── 083000.json
//!     └── 120000.json
//! ```

use crate::models::NewsPage;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `page` to `{json_output_dir}/{date}/{HHMMSS}.json`.
///
/// Returns the path of the written file.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_snapshot(page: &NewsPage, json_output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(page)?;

    let day_dir = Path::new(json_output_dir).join(page.generated_at.format("%Y-%m-%d").to_string());
    info!(dir = %day_dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&day_dir).await {
        error!(dir = %day_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = day_dir.join(format!("{}.json", page.generated_at.format("%H%M%S")));
    fs::write(&path, json).await?;
    info!(
        path = %path.display(),
        articles = page.articles.len(),
        unavailable = page.is_unavailable(),
        "Wrote news snapshot"
    );
    Ok(path)
}
