//! Dashboard route handler.

use axum::{Json, extract::State};
use tracing::instrument;

use super::today;
use crate::db::ReportRepository;
use crate::error::AppError;
use crate::models::DashboardStats;
use crate::state::AppState;

/// Counts shown on the landing page.
///
/// GET /api/dashboard
#[instrument(skip(state))]
pub async fn stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let stats = ReportRepository::new(state.pool())
        .dashboard_stats(today())
        .await?;
    Ok(Json(stats))
}
