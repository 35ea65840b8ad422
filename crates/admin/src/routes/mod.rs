//! HTTP route handlers.
//!
//! JSON API under `/api`, spreadsheet downloads under `/download`.

pub mod backup;
pub mod categories;
pub mod dashboard;
pub mod orders;
pub mod reports;
pub mod uploads;

use axum::{
    Router,
    body::Bytes,
    extract::Multipart,
    http::header,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::AppError;
use crate::services::XLSX_CONTENT_TYPE;
use crate::state::AppState;

/// Name of the multipart field holding uploaded files.
const UPLOAD_FIELD: &str = "file";

/// Category and product mapping routes.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/api/categories/{id}",
            put(categories::update).delete(categories::remove),
        )
        .route(
            "/api/products/uncategorized",
            get(categories::uncategorized),
        )
        .route("/api/products/assign", post(categories::assign))
}

/// Order listing and lifecycle routes.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(orders::list))
        .route("/api/orders/dates", get(orders::dates))
        .route("/api/orders/auto-complete", post(orders::auto_complete))
        .route("/api/orders/{id}", delete(orders::remove))
        .route("/api/orders/{id}/complete", post(orders::complete))
        .route("/api/orders/{id}/postpone", post(orders::postpone))
        .route("/api/orders/{id}/reactivate", post(orders::reactivate))
}

/// Shopping list and pick sheet routes.
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/shopping-list/{date}", get(reports::shopping_list))
        .route(
            "/download/shopping-list/{date}",
            get(reports::download_shopping_list),
        )
        .route(
            "/download/pick-list/{date}",
            get(reports::download_pick_list),
        )
}

/// Backup download, email, configuration and restore routes.
pub fn backup_routes() -> Router<AppState> {
    Router::new()
        .route("/download/backup", get(backup::download))
        .route("/api/backup/send", post(backup::send))
        .route("/api/backup/config", post(backup::config))
        .route("/api/backup/restore", post(backup::restore))
}

/// Build the complete router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard", get(dashboard::stats))
        .route("/api/upload", post(uploads::upload_csv))
        .merge(category_routes())
        .merge(order_routes())
        .merge(report_routes())
        .merge(backup_routes())
}

/// Generic acknowledgement body.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Ack {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

/// Parse a `YYYY-MM-DD` path or query parameter.
pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid date {value:?}, expected YYYY-MM-DD")))
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// An uploaded file.
pub(crate) struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Read the `file` field of a multipart upload, rejecting filenames
/// without the expected extension.
pub(crate) async fn read_upload(
    mut multipart: Multipart,
    extension: &str,
) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !filename.to_lowercase().ends_with(extension) {
            return Err(AppError::BadRequest(format!(
                "expected a {extension} file, got {filename:?}"
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?;
        return Ok(Upload { filename, bytes });
    }

    Err(AppError::BadRequest("no file uploaded".to_string()))
}

/// Respond with an xlsx attachment.
pub(crate) fn xlsx_download(filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-03-10").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
        );
        assert!(matches!(parse_date("10/03/2026"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_date("2026-02-30"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_xlsx_download_headers() {
        let response = xlsx_download("backup.xlsx", vec![1, 2, 3]);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"backup.xlsx\""
        );
    }
}
