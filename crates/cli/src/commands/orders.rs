//! Order import and housekeeping commands.

use std::path::Path;

use chrono::Local;
use sqlx::SqlitePool;

use vega_admin::db::OrderRepository;
use vega_admin::services::import_csv;

use super::read_file;

/// Import a Shopify orders export.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the import fails.
pub async fn import(pool: &SqlitePool, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = read_file(file).await?;
    let summary = import_csv(pool, &bytes).await?;

    tracing::info!(
        file = %file.display(),
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        missing_date = summary.missing_date,
        "Import complete"
    );
    Ok(())
}

/// Complete every pending order whose delivery date has passed.
///
/// # Errors
///
/// Returns an error if the update fails.
pub async fn auto_complete(pool: &SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
    let now = Local::now();
    let completed = OrderRepository::new(pool)
        .auto_complete_past(now.date_naive(), now.naive_local())
        .await?;

    tracing::info!(completed, "Past orders auto-completed");
    Ok(())
}
