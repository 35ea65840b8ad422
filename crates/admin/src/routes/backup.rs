//! Backup download, email delivery, configuration and restore.

use axum::{
    Json,
    extract::{Multipart, Query, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::instrument;

use super::{Ack, now, read_upload, xlsx_download};
use crate::db::settings::{BackupSettingsUpdate, save_backup_settings};
use crate::error::AppError;
use crate::services::{
    BackupAttachment, RestoreOptions, RestoreSummary, backup_filename, build_backup,
    restore_backup, send_backup_email,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RestoreQuery {
    /// Store stale pending orders as completed (default: true).
    #[serde(default)]
    pub auto_complete: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: RestoreSummary,
}

/// GET /download/backup
#[instrument(skip(state))]
pub async fn download(State(state): State<AppState>) -> Result<Response, AppError> {
    let now = now();
    let bytes = build_backup(state.pool(), now).await?;
    Ok(xlsx_download(&backup_filename(now), bytes))
}

/// Email a fresh backup in the background.
///
/// POST /api/backup/send
#[instrument(skip(state))]
pub async fn send(State(state): State<AppState>) -> Json<Ack> {
    let pool = state.pool().clone();
    tokio::spawn(async move {
        match email_backup(&pool).await {
            Ok(true) => tracing::info!("Backup emailed"),
            Ok(false) => {}
            Err(e) => tracing::error!(error = %e, "Failed to email backup"),
        }
    });

    Json(Ack::with_message("Backup en proceso de envío"))
}

async fn email_backup(pool: &SqlitePool) -> Result<bool, AppError> {
    let generated_at = now();
    let bytes = build_backup(pool, generated_at).await?;
    let filename = backup_filename(generated_at);

    let sent = send_backup_email(
        pool,
        BackupAttachment {
            filename: &filename,
            bytes,
            generated_at,
        },
    )
    .await?;
    Ok(sent)
}

/// POST /api/backup/config
#[instrument(skip(state))]
pub async fn config(
    State(state): State<AppState>,
    Json(update): Json<BackupSettingsUpdate>,
) -> Result<Json<Ack>, AppError> {
    save_backup_settings(state.pool(), &update).await?;
    tracing::info!(email = %update.email, "Backup settings saved");
    Ok(Json(Ack::ok()))
}

/// Restore a backup workbook.
///
/// POST /api/backup/restore (multipart, field `file`)
#[instrument(skip(state, multipart))]
pub async fn restore(
    State(state): State<AppState>,
    Query(query): Query<RestoreQuery>,
    multipart: Multipart,
) -> Result<Json<RestoreResponse>, AppError> {
    let upload = read_upload(multipart, ".xlsx").await?;
    tracing::info!(filename = %upload.filename, bytes = upload.bytes.len(), "Backup uploaded");

    let options = RestoreOptions {
        now: now(),
        auto_complete_past: query.auto_complete.unwrap_or(true),
    };
    let summary = restore_backup(state.pool(), &upload.bytes, options).await?;

    Ok(Json(RestoreResponse {
        success: true,
        summary,
    }))
}
