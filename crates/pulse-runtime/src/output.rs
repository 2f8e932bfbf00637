//! Writing the report and rendered artifacts to disk.
//!
//! Every write goes to a sibling temp file first and is renamed into place,
//! so a reader never sees a half-written document. These are the only
//! failures that abort a run.

use std::path::{Path, PathBuf};

use pulse_core::error::{PulseError, Result};
use pulse_core::models::ProfileReport;
use tracing::debug;

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `contents` to `path` atomically, creating parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let output_err = |source: std::io::Error| PulseError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(output_err)?;
    }

    let tmp = temp_path(path);
    std::fs::write(&tmp, contents).map_err(output_err)?;
    std::fs::rename(&tmp, path).map_err(output_err)?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Serialise the report as pretty JSON and write it to `path`.
pub fn write_report(report: &ProfileReport, path: &Path) -> Result<()> {
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    write_atomic(path, json.as_bytes())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
