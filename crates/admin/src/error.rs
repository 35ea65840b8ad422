//! Unified error handling for the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{BackupError, EmailError, ImportError, SpreadsheetError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// CSV import failed.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Backup or restore failed.
    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    /// Workbook generation failed.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] SpreadsheetError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::Database(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::Database(RepositoryError::Conflict(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Import(err) => match err {
                ImportError::Repository(RepositoryError::Conflict(_)) => StatusCode::BAD_REQUEST,
                ImportError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Backup(err) if err.is_bad_input() => StatusCode::BAD_REQUEST,
            Self::Database(_)
            | Self::Backup(_)
            | Self::Spreadsheet(_)
            | Self::Email(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Rejected request");
        }

        // Don't expose internal error details to clients
        let message = match &self {
            _ if status.is_server_error() => "Internal server error".to_string(),
            Self::Database(RepositoryError::Conflict(detail)) => detail.clone(),
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 123".to_string());
        assert_eq!(err.to_string(), "Not found: order 123");

        let err = AppError::BadRequest("invalid date".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid date");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_errors_map_to_client_statuses() {
        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("duplicate".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("bad".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_import_errors_are_bad_requests() {
        assert_eq!(
            get_status(ImportError::MissingColumn("Name").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                ImportError::Repository(RepositoryError::DataCorruption(String::new())).into()
            ),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_restore_input_errors_are_bad_requests() {
        let err = BackupError::InvalidRow {
            sheet: "Pedidos",
            row: 2,
            message: "missing order number".to_string(),
        };
        assert_eq!(get_status(err.into()), StatusCode::BAD_REQUEST);
    }
}
