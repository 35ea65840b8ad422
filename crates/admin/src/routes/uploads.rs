//! Shopify CSV upload.

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::Serialize;
use tracing::instrument;

use super::read_upload;
use crate::error::AppError;
use crate::services::{ImportSummary, import_csv};
use crate::state::AppState;

/// Response for a CSV upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: ImportSummary,
}

/// Import a Shopify orders export.
///
/// POST /api/upload (multipart, field `file`)
#[instrument(skip(state, multipart))]
pub async fn upload_csv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = read_upload(multipart, ".csv").await?;
    tracing::info!(filename = %upload.filename, bytes = upload.bytes.len(), "CSV uploaded");

    let summary = import_csv(state.pool(), &upload.bytes).await?;
    Ok(Json(UploadResponse {
        success: true,
        summary,
    }))
}
