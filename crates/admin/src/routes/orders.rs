//! Order listing and lifecycle transitions.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vega_core::OrderId;

use super::{Ack, now, parse_date, today};
use crate::db::{OrderFilter, OrderRepository, ReportRepository, StatusFilter};
use crate::error::AppError;
use crate::models::{OrderWithLines, PendingDate};
use crate::state::AppState;

/// Query parameters for the order listing.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    /// Delivery date, `YYYY-MM-DD`.
    pub date: Option<String>,
    /// `all`, `active` or an order status.
    pub status: Option<String>,
}

impl OrderListQuery {
    fn filter(&self) -> Result<OrderFilter, AppError> {
        let delivery_date = self
            .date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(parse_date)
            .transpose()?;
        let status = self
            .status
            .as_deref()
            .map(str::parse::<StatusFilter>)
            .transpose()
            .map_err(AppError::BadRequest)?
            .unwrap_or_default();

        Ok(OrderFilter {
            delivery_date,
            status,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PostponeRequest {
    pub new_date: String,
}

#[derive(Debug, Serialize)]
pub struct AutoCompleteResponse {
    pub success: bool,
    pub completed: u64,
}

/// GET /api/orders?date=&status=
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderWithLines>>, AppError> {
    let filter = query.filter()?;
    let orders = OrderRepository::new(state.pool()).list(filter).await?;
    Ok(Json(orders))
}

/// Delivery dates that still have active orders.
///
/// GET /api/orders/dates
#[instrument(skip(state))]
pub async fn dates(State(state): State<AppState>) -> Result<Json<Vec<PendingDate>>, AppError> {
    let dates = ReportRepository::new(state.pool()).pending_dates().await?;
    Ok(Json(dates))
}

/// POST /api/orders/{id}/complete
#[instrument(skip(state))]
pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Ack>, AppError> {
    OrderRepository::new(state.pool()).complete(id, now()).await?;
    tracing::info!(order_id = %id, "Order completed");
    Ok(Json(Ack::ok()))
}

/// POST /api/orders/{id}/postpone
#[instrument(skip(state))]
pub async fn postpone(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(request): Json<PostponeRequest>,
) -> Result<Json<Ack>, AppError> {
    let new_date = parse_date(&request.new_date)?;
    OrderRepository::new(state.pool())
        .postpone(id, new_date)
        .await?;
    tracing::info!(order_id = %id, %new_date, "Order postponed");
    Ok(Json(Ack::ok()))
}

/// POST /api/orders/{id}/reactivate
#[instrument(skip(state))]
pub async fn reactivate(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Ack>, AppError> {
    OrderRepository::new(state.pool()).reactivate(id).await?;
    tracing::info!(order_id = %id, "Order reactivated");
    Ok(Json(Ack::ok()))
}

/// Complete every pending order whose delivery date has passed.
///
/// POST /api/orders/auto-complete
#[instrument(skip(state))]
pub async fn auto_complete(
    State(state): State<AppState>,
) -> Result<Json<AutoCompleteResponse>, AppError> {
    let completed = OrderRepository::new(state.pool())
        .auto_complete_past(today(), now())
        .await?;
    tracing::info!(completed, "Past orders auto-completed");
    Ok(Json(AutoCompleteResponse {
        success: true,
        completed,
    }))
}

/// DELETE /api/orders/{id}
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Ack>, AppError> {
    OrderRepository::new(state.pool()).delete(id).await?;
    tracing::info!(order_id = %id, "Order deleted");
    Ok(Json(Ack::ok()))
}
