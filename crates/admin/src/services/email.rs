//! Email delivery of backups.
//!
//! Uses SMTP via lettre with an Askama plain-text body. SMTP credentials
//! are read from the `settings` table at send time, so staff can change
//! them without a restart.

use askama::Template;
use chrono::NaiveDateTime;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{
        Attachment, MultiPart, SinglePart,
        header::{ContentType, ContentTypeErr},
    },
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::instrument;

use super::spreadsheet::XLSX_CONTENT_TYPE;
use crate::db::settings::{get_setting_or_empty, keys};
use crate::db::{OrderRepository, RepositoryError};

const DEFAULT_SMTP_PORT: u16 = 587;

/// Plain text body of the backup email.
#[derive(Template)]
#[template(path = "email/backup.txt")]
struct BackupEmailText<'a> {
    generated: &'a str,
    pending: i64,
    postponed: i64,
    filename: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Invalid attachment content type.
    #[error("Invalid content type: {0}")]
    ContentType(#[from] ContentTypeErr),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// SMTP settings as stored in the `settings` table.
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Where backups are sent.
    pub destination: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("destination", &self.destination)
            .finish()
    }
}

impl SmtpSettings {
    /// Load the SMTP settings. Returns `None` unless a destination, a user
    /// and a password are all configured.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn load(pool: &SqlitePool) -> Result<Option<Self>, RepositoryError> {
        let destination = get_setting_or_empty(pool, keys::BACKUP_EMAIL).await?;
        let username = get_setting_or_empty(pool, keys::SMTP_USER).await?;
        let password = get_setting_or_empty(pool, keys::SMTP_PASSWORD).await?;
        if destination.trim().is_empty() || username.trim().is_empty() || password.is_empty() {
            return Ok(None);
        }

        let host = get_setting_or_empty(pool, keys::SMTP_HOST).await?;
        let port = get_setting_or_empty(pool, keys::SMTP_PORT)
            .await?
            .trim()
            .parse()
            .unwrap_or(DEFAULT_SMTP_PORT);

        Ok(Some(Self {
            host: host.trim().to_string(),
            port,
            username: username.trim().to_string(),
            password: SecretString::from(password),
            destination: destination.trim().to_string(),
        }))
    }
}

/// Email service for sending backups.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from SMTP settings.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(settings: &SmtpSettings) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            settings.username.clone(),
            settings.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            .port(settings.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: settings.username.clone(),
        })
    }

    /// Send a backup workbook as an attachment.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send or the template fails to
    /// render.
    pub async fn send_backup(
        &self,
        to: &str,
        backup: BackupAttachment<'_>,
        pending: i64,
        postponed: i64,
    ) -> Result<(), EmailError> {
        let generated = backup.generated_at.format("%Y-%m-%d %H:%M").to_string();
        let text = BackupEmailText {
            generated: &generated,
            pending,
            postponed,
            filename: backup.filename,
        }
        .render()?;
        let subject = format!(
            "Backup Sistema La Vega - {}",
            backup.generated_at.format("%Y-%m-%d")
        );

        let content_type = ContentType::parse(XLSX_CONTENT_TYPE)?;

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(&subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        Attachment::new(backup.filename.to_string())
                            .body(backup.bytes, content_type),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// A backup workbook ready to be mailed.
#[derive(Debug, Clone)]
pub struct BackupAttachment<'a> {
    pub filename: &'a str,
    pub bytes: Vec<u8>,
    pub generated_at: NaiveDateTime,
}

/// Email a backup to the configured destination.
///
/// Returns `Ok(false)` without sending when the destination or the SMTP
/// credentials are not configured.
///
/// # Errors
///
/// Returns `EmailError` if settings cannot be read or delivery fails.
#[instrument(skip(pool, backup), fields(filename = %backup.filename))]
pub async fn send_backup_email(
    pool: &SqlitePool,
    backup: BackupAttachment<'_>,
) -> Result<bool, EmailError> {
    let Some(settings) = SmtpSettings::load(pool).await? else {
        tracing::warn!("Backup email not sent: destination or SMTP credentials missing");
        return Ok(false);
    };

    let counts = OrderRepository::new(pool).status_counts().await?;
    let service = EmailService::new(&settings)?;
    service
        .send_backup(&settings.destination, backup, counts.pending, counts.postponed)
        .await?;
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::create_memory_pool;
    use crate::db::settings::set_setting;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_backup_email_text() {
        let text = BackupEmailText {
            generated: "2026-03-10 08:00",
            pending: 4,
            postponed: 1,
            filename: "backup_vega_2026-03-10_0800.xlsx",
        }
        .render()
        .unwrap();

        assert!(text.contains("Fecha: 2026-03-10 08:00"));
        assert!(text.contains("Pedidos pendientes: 4"));
        assert!(text.contains("Pedidos postergados: 1"));
    }

    #[tokio::test]
    async fn test_settings_require_destination_and_credentials() {
        let pool = create_memory_pool().await.unwrap();
        assert!(SmtpSettings::load(&pool).await.unwrap().is_none());

        set_setting(&pool, keys::BACKUP_EMAIL, "dueno@lavega.cl").await.unwrap();
        set_setting(&pool, keys::SMTP_USER, "bodega@lavega.cl").await.unwrap();
        assert!(SmtpSettings::load(&pool).await.unwrap().is_none());

        set_setting(&pool, keys::SMTP_PASSWORD, "app-password").await.unwrap();
        set_setting(&pool, keys::SMTP_PORT, "not-a-port").await.unwrap();
        let settings = SmtpSettings::load(&pool).await.unwrap().unwrap();
        assert_eq!(settings.host, "smtp.gmail.com");
        assert_eq!(settings.port, DEFAULT_SMTP_PORT);
        assert!(!format!("{settings:?}").contains("app-password"));
    }

    #[tokio::test]
    async fn test_send_without_settings_is_skipped() {
        let pool = create_memory_pool().await.unwrap();
        let sent = send_backup_email(
            &pool,
            BackupAttachment {
                filename: "backup.xlsx",
                bytes: Vec::new(),
                generated_at: generated_at(),
            },
        )
        .await
        .unwrap();
        assert!(!sent);
    }
}
