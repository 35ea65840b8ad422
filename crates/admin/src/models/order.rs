//! Orders and order lines.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;

use vega_core::{OrderId, OrderLineId, OrderNumber, OrderStatus};

/// A stored order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub email: Option<String>,
    /// Delivery commune, taken from the "Comuna de Entrega" note attribute.
    pub delivery_zone: Option<String>,
    /// Current delivery date. Changes when the order is postponed.
    pub delivery_date: Option<NaiveDate>,
    /// Delivery date at import time. Never changed afterwards.
    pub original_delivery_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub customer_name: Option<String>,
    pub total: Decimal,
    pub created_at: Option<NaiveDateTime>,
    pub imported_at: Option<NaiveDateTime>,
    pub status: OrderStatus,
    pub completed_at: Option<NaiveDateTime>,
}

impl Order {
    /// Returns true if the delivery date was moved away from the original.
    #[cfg(test)]
    pub(crate) fn was_rescheduled(&self) -> bool {
        self.delivery_date != self.original_delivery_date
    }
}

/// One product entry within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product: String,
    pub quantity: i64,
    pub price: Decimal,
    pub sku: Option<String>,
}

/// An order together with its line items, as listed by the API and pick sheets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWithLines {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// An order ready to be inserted (from a CSV import or a backup restore).
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub email: Option<String>,
    pub delivery_zone: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub original_delivery_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub customer_name: Option<String>,
    pub total: Decimal,
    pub created_at: Option<NaiveDateTime>,
    /// Import time carried over from a backup. The database stamps the
    /// current time when unset.
    pub imported_at: Option<NaiveDateTime>,
    pub status: OrderStatus,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    /// Create an empty pending order with the given number.
    #[must_use]
    pub fn new(order_number: OrderNumber) -> Self {
        Self {
            order_number,
            email: None,
            delivery_zone: None,
            delivery_date: None,
            original_delivery_date: None,
            address: None,
            phone: None,
            customer_name: None,
            total: Decimal::ZERO,
            created_at: None,
            imported_at: None,
            status: OrderStatus::Pending,
            lines: Vec::new(),
        }
    }
}

/// A line item ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product: String,
    pub quantity: i64,
    pub price: Decimal,
    pub sku: Option<String>,
}
