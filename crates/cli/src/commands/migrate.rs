//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! vega-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - SQLite connection string (default: `sqlite://vega.db`)
//!
//! # Migration Files
//!
//! `crates/admin/migrations/`, embedded in the `vega-admin` crate.

use sqlx::SqlitePool;

use super::CommandError;

/// Apply any pending migrations.
///
/// # Errors
///
/// Returns `CommandError::Migration` if a migration fails.
pub async fn run(pool: &SqlitePool) -> Result<(), CommandError> {
    tracing::debug!("Running migrations...");
    vega_admin::db::run_migrations(pool).await?;
    Ok(())
}
