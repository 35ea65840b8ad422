//! Product categories for shopping-list grouping.

use serde::Serialize;

use vega_core::CategoryId;

/// Bucket name for products without a category mapping.
pub const UNCATEGORIZED_LABEL: &str = "Sin Categoría";

/// Display order of the uncategorized bucket (after every real category).
pub const UNCATEGORIZED_ORDER: i64 = 999;

/// Display order given to restored categories that carry none.
pub const DEFAULT_RESTORED_ORDER: i64 = 99;

/// A named, ordered shopping-list bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub display_order: i64,
}

/// A product name mapped to a category, by category name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductMapping {
    pub product: String,
    pub category: String,
}
