//! Domain models for the order store.

pub mod category;
pub mod order;
pub mod report;

pub use category::{
    Category, DEFAULT_RESTORED_ORDER, ProductMapping, UNCATEGORIZED_LABEL, UNCATEGORIZED_ORDER,
};
pub use order::{NewOrder, NewOrderLine, Order, OrderLine, OrderWithLines};
pub use report::{
    CategoryGroup, DashboardStats, PendingDate, ShoppingItem, ShoppingList, StatusCounts,
};
