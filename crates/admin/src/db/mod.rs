//! Database operations for the order store (SQLite).
//!
//! ## Tables
//!
//! - `orders` - One row per Shopify order number
//! - `order_lines` - Line items, owned by an order
//! - `categories` - Shopping-list buckets with a display order
//! - `product_categories` - Sparse product name → category mapping
//! - `settings` - Flat key/value configuration (backup email, SMTP)
//!
//! # Migrations
//!
//! Migrations live in `crates/admin/migrations/` and are embedded in the
//! binary. They run on server startup and via:
//! ```bash
//! cargo run -p vega-cli -- migrate
//! ```

pub mod categories;
pub mod orders;
pub mod reports;
pub mod settings;

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

pub use categories::CategoryRepository;
pub use orders::{OrderFilter, OrderRepository, StatusFilter};
pub use reports::ReportRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate category name).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to [`RepositoryError::Conflict`].
    pub(crate) fn from_unique(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(message.into())
            }
            _ => Self::Database(err),
        }
    }
}

/// Create a SQLite connection pool.
///
/// The database file is created if it does not exist. Foreign keys are
/// enforced and WAL journaling is enabled.
///
/// # Arguments
///
/// * `database_url` - SQLite connection string, e.g. `sqlite://vega.db`
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be
/// established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Create a private in-memory database with the schema applied.
///
/// Uses a single connection that never expires, so every query sees the
/// same database. Intended for tests and dry runs.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection or a migration fails.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Apply the embedded migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Parse a decimal stored as TEXT. `NULL` and empty strings read as zero.
pub(crate) fn parse_stored_decimal(
    value: Option<&str>,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    match value.map(str::trim) {
        None | Some("") => Ok(Decimal::ZERO),
        Some(text) => Decimal::from_str(text).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid decimal in {column}: {text:?} ({e})"))
        }),
    }
}
