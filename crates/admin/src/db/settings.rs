//! Settings database operations.
//!
//! Flat key/value configuration: backup destination, backup schedule and
//! SMTP credentials.

use sqlx::SqlitePool;

use super::RepositoryError;

/// Well-known setting keys.
pub mod keys {
    pub const BACKUP_EMAIL: &str = "backup_email";
    pub const BACKUP_FREQUENCY: &str = "backup_frequency";
    pub const SMTP_HOST: &str = "smtp_host";
    pub const SMTP_PORT: &str = "smtp_port";
    pub const SMTP_USER: &str = "smtp_user";
    pub const SMTP_PASSWORD: &str = "smtp_password";
}

/// Get a setting value. Missing keys read as `None`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>, RepositoryError> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(value)
}

/// Get a setting value, treating missing keys as the empty string.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_setting_or_empty(
    pool: &SqlitePool,
    key: &str,
) -> Result<String, RepositoryError> {
    Ok(get_setting(pool, key).await?.unwrap_or_default())
}

/// Set a setting value, replacing any previous value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn set_setting(
    pool: &SqlitePool,
    key: &str,
    value: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT (key) DO UPDATE SET value = excluded.value
        ",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Backup configuration as submitted by staff.
#[derive(Clone, Default, serde::Deserialize)]
pub struct BackupSettingsUpdate {
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_frequency")]
    pub frequency: String,
    #[serde(default)]
    pub smtp_user: String,
    #[serde(default)]
    pub smtp_password: String,
}

fn default_frequency() -> String {
    "3".to_string()
}

impl std::fmt::Debug for BackupSettingsUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupSettingsUpdate")
            .field("email", &self.email)
            .field("frequency", &self.frequency)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &"[REDACTED]")
            .finish()
    }
}

/// Store the backup configuration.
///
/// Destination email and frequency are always written. SMTP user and
/// password are only written when non-empty, so a blank form field keeps
/// the stored credential.
///
/// # Errors
///
/// Returns an error if a database write fails.
pub async fn save_backup_settings(
    pool: &SqlitePool,
    update: &BackupSettingsUpdate,
) -> Result<(), RepositoryError> {
    set_setting(pool, keys::BACKUP_EMAIL, update.email.trim()).await?;
    set_setting(pool, keys::BACKUP_FREQUENCY, update.frequency.trim()).await?;
    if !update.smtp_user.trim().is_empty() {
        set_setting(pool, keys::SMTP_USER, update.smtp_user.trim()).await?;
    }
    if !update.smtp_password.is_empty() {
        set_setting(pool, keys::SMTP_PASSWORD, &update.smtp_password).await?;
    }
    Ok(())
}
