//! Read-only projections used by reports and the dashboard.

use chrono::NaiveDate;
use serde::Serialize;

use vega_core::OrderStatus;

/// Aggregated quantity of one product for a delivery date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingItem {
    pub product: String,
    pub quantity: i64,
}

/// Products of one category, in product-name order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub display_order: i64,
    pub items: Vec<ShoppingItem>,
}

/// Shopping list for a delivery date, grouped by category display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct ShoppingList {
    pub groups: Vec<CategoryGroup>,
}

impl ShoppingList {
    /// Total number of distinct products on the list.
    #[must_use]
    pub fn product_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    /// Quantity of a product, if it is on the list.
    #[cfg(test)]
    pub(crate) fn quantity_of(&self, product: &str) -> Option<i64> {
        self.groups
            .iter()
            .flat_map(|g| g.items.iter())
            .find(|item| item.product == product)
            .map(|item| item.quantity)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// A delivery date with active orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct PendingDate {
    pub date: Option<NaiveDate>,
    pub orders: i64,
    pub postponed: i64,
}

/// Number of orders in each status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct StatusCounts {
    pub pending: i64,
    pub postponed: i64,
    pub completed: i64,
}

impl StatusCounts {
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.pending + self.postponed + self.completed
    }

    pub(crate) fn add(&mut self, status: OrderStatus, count: i64) {
        match status {
            OrderStatus::Pending => self.pending += count,
            OrderStatus::Postponed => self.postponed += count,
            OrderStatus::Completed => self.completed += count,
        }
    }
}

/// Figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub pending_orders: i64,
    pub postponed_orders: i64,
    pub pending_dates: i64,
    pub orders_today: i64,
    pub uncategorized_products: i64,
    pub today: NaiveDate,
}
