//! Shopping list and pick sheet export.

use std::path::PathBuf;

use chrono::NaiveDate;
use sqlx::SqlitePool;

use vega_admin::db::ReportRepository;
use vega_admin::services::spreadsheet::{pick_list_filename, shopping_list_filename};
use vega_admin::services::{render_pick_list, render_shopping_list};

use super::write_file;

/// Write the shopping list for `date`.
///
/// # Errors
///
/// Returns an error if the query, rendering or write fails.
pub async fn shopping_list(
    pool: &SqlitePool,
    date: NaiveDate,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let list = ReportRepository::new(pool).shopping_list(date).await?;
    if list.is_empty() {
        tracing::warn!(%date, "No active orders for this date");
    }

    let bytes = render_shopping_list(date, &list)?;
    let path = output.unwrap_or_else(|| PathBuf::from(shopping_list_filename(date)));
    write_file(&path, &bytes).await?;

    tracing::info!(%date, products = list.product_count(), "Shopping list written");
    Ok(())
}

/// Write the pick sheet for `date`.
///
/// # Errors
///
/// Returns an error if the query, rendering or write fails.
pub async fn pick_list(
    pool: &SqlitePool,
    date: NaiveDate,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let orders = ReportRepository::new(pool).pick_list(date).await?;

    let bytes = render_pick_list(date, &orders)?;
    let path = output.unwrap_or_else(|| PathBuf::from(pick_list_filename(date)));
    write_file(&path, &bytes).await?;

    tracing::info!(%date, orders = orders.len(), "Pick sheet written");
    Ok(())
}
