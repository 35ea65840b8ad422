//! Shopping lists and pick sheets, as JSON and as xlsx downloads.

use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::instrument;

use super::{parse_date, xlsx_download};
use crate::db::ReportRepository;
use crate::error::AppError;
use crate::models::ShoppingList;
use crate::services::spreadsheet::{pick_list_filename, shopping_list_filename};
use crate::services::{render_pick_list, render_shopping_list};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ShoppingListResponse {
    pub date: NaiveDate,
    pub product_count: usize,
    #[serde(flatten)]
    pub list: ShoppingList,
}

/// Aggregated products for a delivery date, grouped by category.
///
/// GET /api/shopping-list/{date}
#[instrument(skip(state))]
pub async fn shopping_list(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<ShoppingListResponse>, AppError> {
    let date = parse_date(&date)?;
    let list = ReportRepository::new(state.pool())
        .shopping_list(date)
        .await?;

    Ok(Json(ShoppingListResponse {
        date,
        product_count: list.product_count(),
        list,
    }))
}

/// GET /download/shopping-list/{date}
#[instrument(skip(state))]
pub async fn download_shopping_list(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Response, AppError> {
    let date = parse_date(&date)?;
    let list = ReportRepository::new(state.pool())
        .shopping_list(date)
        .await?;

    let bytes = render_shopping_list(date, &list)?;
    Ok(xlsx_download(&shopping_list_filename(date), bytes))
}

/// GET /download/pick-list/{date}
#[instrument(skip(state))]
pub async fn download_pick_list(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Response, AppError> {
    let date = parse_date(&date)?;
    let orders = ReportRepository::new(state.pool()).pick_list(date).await?;

    let bytes = render_pick_list(date, &orders)?;
    Ok(xlsx_download(&pick_list_filename(date), bytes))
}
