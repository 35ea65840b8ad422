//! CLI command implementations.

pub mod backup;
pub mod migrate;
pub mod orders;
pub mod reports;

use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use thiserror::Error;

use vega_admin::config::{AdminConfig, ConfigError};
use vega_admin::db;

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Connect to the database named by `DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the database cannot
/// be opened.
pub async fn connect() -> Result<SqlitePool, CommandError> {
    let config = AdminConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    Ok(pool)
}

pub(crate) async fn read_file(path: &Path) -> Result<Vec<u8>, CommandError> {
    tokio::fs::read(path).await.map_err(|source| CommandError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CommandError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| CommandError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "File written");
    Ok(())
}
