//! Category management and product assignment.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use vega_core::CategoryId;

use super::Ack;
use crate::db::CategoryRepository;
use crate::error::AppError;
use crate::models::Category;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_order: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub product: String,
    pub category_id: CategoryId,
}

fn required_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("category name is required".to_string()));
    }
    Ok(name)
}

/// GET /api/categories
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Json(categories))
}

/// POST /api/categories
#[instrument(skip(state))]
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    let name = required_name(&request.name)?;
    let category = CategoryRepository::new(state.pool()).create(name).await?;
    Ok(Json(category))
}

/// PUT /api/categories/{id}
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    let name = request.name.as_deref().map(required_name).transpose()?;
    let category = CategoryRepository::new(state.pool())
        .update(id, name, request.display_order)
        .await?;
    Ok(Json(category))
}

/// DELETE /api/categories/{id}
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Ack>, AppError> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    Ok(Json(Ack::ok()))
}

/// Products that still need a category.
///
/// GET /api/products/uncategorized
#[instrument(skip(state))]
pub async fn uncategorized(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let products = CategoryRepository::new(state.pool())
        .uncategorized_products()
        .await?;
    Ok(Json(products))
}

/// POST /api/products/assign
#[instrument(skip(state))]
pub async fn assign(
    State(state): State<AppState>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<Ack>, AppError> {
    let product = request.product.trim();
    if product.is_empty() {
        return Err(AppError::BadRequest("product is required".to_string()));
    }

    CategoryRepository::new(state.pool())
        .assign(product, request.category_id)
        .await?;
    tracing::info!(product = %product, category_id = %request.category_id, "Product assigned");
    Ok(Json(Ack::ok()))
}
