//! Implementation of the `curve export` command.
//!
//! Writes the committed snapshot to `activity.json` as a flat object of
//! file identifier to milliseconds. Unlike background persistence, failures
//! here are reported to the user.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use curve_core::AccumulatedTime;
use curve_db::Database;

use super::show::load_snapshot;

/// File name written inside the export directory.
pub const EXPORT_FILE_NAME: &str = "activity.json";

/// Runs the export command, printing the written path.
pub fn run(db: &Database, export_dir: &Path) -> Result<()> {
    let data = load_snapshot(db)?;
    let path = export_snapshot(&data, export_dir)?;
    println!("Focus data exported to: {}", path.display());
    Ok(())
}

/// Serializes `data` into `<dir>/activity.json` and returns the file path.
pub fn export_snapshot(data: &AccumulatedTime, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;

    let path = dir.join(EXPORT_FILE_NAME);
    let json = serde_json::to_string_pretty(data).context("failed to serialize focus data")?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write export file {}", path.display()))?;

    tracing::info!(path = %path.display(), files = data.len(), "exported focus data");
    Ok(path)
}
