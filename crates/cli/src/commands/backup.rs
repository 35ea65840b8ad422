//! Backup and restore commands.

use std::path::{Path, PathBuf};

use chrono::Local;
use sqlx::SqlitePool;

use vega_admin::services::{RestoreOptions, backup_filename, build_backup, restore_backup};

use super::{read_file, write_file};

/// Export every table to an xlsx workbook.
///
/// # Errors
///
/// Returns an error if the export or write fails.
pub async fn backup(
    pool: &SqlitePool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let now = Local::now().naive_local();
    let bytes = build_backup(pool, now).await?;

    let path = output.unwrap_or_else(|| PathBuf::from(backup_filename(now)));
    write_file(&path, &bytes).await?;
    Ok(())
}

/// Restore a backup workbook. Existing orders are never overwritten.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid backup.
pub async fn restore(
    pool: &SqlitePool,
    file: &Path,
    auto_complete_past: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = read_file(file).await?;
    let options = RestoreOptions {
        now: Local::now().naive_local(),
        auto_complete_past,
    };
    let summary = restore_backup(pool, &bytes, options).await?;

    tracing::info!(
        file = %file.display(),
        restored = summary.restored,
        skipped = summary.skipped,
        auto_completed = summary.auto_completed,
        lines = summary.lines_restored,
        categories = summary.categories_added,
        mappings = summary.mappings_added,
        "Restore complete"
    );
    Ok(())
}
