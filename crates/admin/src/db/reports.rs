//! Read-only report queries.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use super::{OrderFilter, OrderRepository, RepositoryError};
use crate::models::{
    CategoryGroup, DashboardStats, OrderWithLines, PendingDate, ShoppingItem, ShoppingList,
    UNCATEGORIZED_LABEL, UNCATEGORIZED_ORDER,
};

#[derive(Debug, sqlx::FromRow)]
struct ShoppingRow {
    product: String,
    quantity: i64,
    category: String,
    category_order: i64,
}

/// Repository for report queries.
pub struct ReportRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ReportRepository<'a> {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Total quantity per product over the active orders of a delivery date.
    ///
    /// Groups follow category display order; uncategorized products come
    /// last under [`UNCATEGORIZED_LABEL`]. Within a group, products are
    /// sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn shopping_list(&self, date: NaiveDate) -> Result<ShoppingList, RepositoryError> {
        let rows = sqlx::query_as::<_, ShoppingRow>(
            r"
            SELECT l.product AS product,
                   SUM(l.quantity) AS quantity,
                   COALESCE(c.name, ?) AS category,
                   COALESCE(c.display_order, ?) AS category_order
            FROM order_lines l
            JOIN orders o ON l.order_id = o.id
            LEFT JOIN product_categories pc ON l.product = pc.product
            LEFT JOIN categories c ON pc.category_id = c.id
            WHERE o.delivery_date = ? AND o.status IN ('pending', 'postponed')
            GROUP BY l.product
            ORDER BY category_order, category, l.product
            ",
        )
        .bind(UNCATEGORIZED_LABEL)
        .bind(UNCATEGORIZED_ORDER)
        .bind(date)
        .fetch_all(self.pool)
        .await?;

        Ok(group_by_category(rows))
    }

    /// Active orders of a delivery date with their lines, for pick sheets.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn pick_list(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<OrderWithLines>, RepositoryError> {
        OrderRepository::new(self.pool)
            .list(OrderFilter::active_on(date))
            .await
    }

    /// Delivery dates that still have active orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pending_dates(&self) -> Result<Vec<PendingDate>, RepositoryError> {
        let dates = sqlx::query_as::<_, PendingDate>(
            r"
            SELECT delivery_date AS date,
                   COUNT(*) AS orders,
                   SUM(CASE WHEN status = 'postponed' THEN 1 ELSE 0 END) AS postponed
            FROM orders
            WHERE status IN ('pending', 'postponed')
            GROUP BY delivery_date
            ORDER BY delivery_date
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(dates)
    }

    /// Figures for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn dashboard_stats(
        &self,
        today: NaiveDate,
    ) -> Result<DashboardStats, RepositoryError> {
        let (pending_orders, postponed_orders, pending_dates, orders_today): (i64, i64, i64, i64) =
            sqlx::query_as(
                r"
                SELECT
                    COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'postponed' THEN 1 ELSE 0 END), 0),
                    COUNT(DISTINCT CASE WHEN status IN ('pending', 'postponed')
                                        THEN delivery_date END),
                    COALESCE(SUM(CASE WHEN status IN ('pending', 'postponed')
                                       AND delivery_date = ? THEN 1 ELSE 0 END), 0)
                FROM orders
                ",
            )
            .bind(today)
            .fetch_one(self.pool)
            .await?;

        let uncategorized_products: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(DISTINCT l.product)
            FROM order_lines l
            LEFT JOIN product_categories pc ON l.product = pc.product
            WHERE pc.id IS NULL
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(DashboardStats {
            pending_orders,
            postponed_orders,
            pending_dates,
            orders_today,
            uncategorized_products,
            today,
        })
    }
}

/// Fold rows sorted by (category order, category, product) into groups.
fn group_by_category(rows: Vec<ShoppingRow>) -> ShoppingList {
    let mut groups: Vec<CategoryGroup> = Vec::new();

    for row in rows {
        let item = ShoppingItem {
            product: row.product,
            quantity: row.quantity,
        };
        match groups.last_mut() {
            Some(group) if group.category == row.category => group.items.push(item),
            _ => groups.push(CategoryGroup {
                category: row.category,
                display_order: row.category_order,
                items: vec![item],
            }),
        }
    }

    ShoppingList { groups }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use vega_core::{OrderNumber, OrderStatus};

    use super::*;
    use crate::db::{CategoryRepository, create_memory_pool, orders::insert_order};
    use crate::models::{NewOrder, NewOrderLine};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn seed(
        pool: &SqlitePool,
        number: &str,
        delivery: &str,
        status: OrderStatus,
        lines: &[(&str, i64)],
    ) {
        let mut order = NewOrder::new(OrderNumber::parse(number).unwrap());
        order.delivery_date = Some(date(delivery));
        order.status = status;
        order.lines = lines
            .iter()
            .map(|(product, quantity)| NewOrderLine {
                product: (*product).to_string(),
                quantity: *quantity,
                price: Decimal::ONE,
                sku: None,
            })
            .collect();
        let mut conn = pool.acquire().await.unwrap();
        insert_order(&mut conn, &order, None).await.unwrap();
    }

    async fn categorize(pool: &SqlitePool, product: &str, category: &str) {
        let repo = CategoryRepository::new(pool);
        let id = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.name == category)
            .unwrap()
            .id;
        repo.assign(product, id).await.unwrap();
    }

    #[tokio::test]
    async fn test_shopping_list_sums_across_orders() {
        let pool = create_memory_pool().await.unwrap();
        seed(
            &pool,
            "#1",
            "2026-03-10",
            OrderStatus::Pending,
            &[("Manzana", 2), ("Tomate", 1)],
        )
        .await;
        seed(&pool, "#2", "2026-03-10", OrderStatus::Postponed, &[("Manzana", 3)]).await;
        seed(&pool, "#3", "2026-03-10", OrderStatus::Completed, &[("Manzana", 100)]).await;
        seed(&pool, "#4", "2026-03-11", OrderStatus::Pending, &[("Manzana", 100)]).await;

        let list = ReportRepository::new(&pool)
            .shopping_list(date("2026-03-10"))
            .await
            .unwrap();

        assert_eq!(list.product_count(), 2);
        assert_eq!(list.quantity_of("Manzana"), Some(5));
        assert_eq!(list.quantity_of("Tomate"), Some(1));
    }

    #[tokio::test]
    async fn test_shopping_list_groups_by_category_order() {
        let pool = create_memory_pool().await.unwrap();
        seed(
            &pool,
            "#1",
            "2026-03-10",
            OrderStatus::Pending,
            &[("Zapallo", 1), ("Leche", 2), ("Acelga", 1), ("Pera", 4), ("Misterio", 1)],
        )
        .await;
        categorize(&pool, "Zapallo", "Verduras").await;
        categorize(&pool, "Acelga", "Verduras").await;
        categorize(&pool, "Leche", "Lácteos").await;
        categorize(&pool, "Pera", "Frutas").await;

        let list = ReportRepository::new(&pool)
            .shopping_list(date("2026-03-10"))
            .await
            .unwrap();

        let layout: Vec<(&str, Vec<&str>)> = list
            .groups
            .iter()
            .map(|g| {
                (
                    g.category.as_str(),
                    g.items.iter().map(|i| i.product.as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(
            layout,
            vec![
                ("Frutas", vec!["Pera"]),
                ("Verduras", vec!["Acelga", "Zapallo"]),
                ("Lácteos", vec!["Leche"]),
                (UNCATEGORIZED_LABEL, vec!["Misterio"]),
            ]
        );
        assert_eq!(list.groups.last().unwrap().display_order, UNCATEGORIZED_ORDER);
    }

    #[tokio::test]
    async fn test_shopping_list_empty_date() {
        let pool = create_memory_pool().await.unwrap();
        let list = ReportRepository::new(&pool)
            .shopping_list(date("2026-03-10"))
            .await
            .unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_pending_dates_and_dashboard() {
        let pool = create_memory_pool().await.unwrap();
        seed(&pool, "#1", "2026-03-10", OrderStatus::Pending, &[("Manzana", 1)]).await;
        seed(&pool, "#2", "2026-03-10", OrderStatus::Postponed, &[("Pera", 1)]).await;
        seed(&pool, "#3", "2026-03-12", OrderStatus::Pending, &[("Manzana", 1)]).await;
        seed(&pool, "#4", "2026-03-12", OrderStatus::Completed, &[("Kiwi", 1)]).await;
        categorize(&pool, "Manzana", "Frutas").await;

        let repo = ReportRepository::new(&pool);
        let dates = repo.pending_dates().await.unwrap();
        assert_eq!(
            dates,
            vec![
                PendingDate { date: Some(date("2026-03-10")), orders: 2, postponed: 1 },
                PendingDate { date: Some(date("2026-03-12")), orders: 1, postponed: 0 },
            ]
        );

        let stats = repo.dashboard_stats(date("2026-03-10")).await.unwrap();
        assert_eq!(stats.pending_orders, 2);
        assert_eq!(stats.postponed_orders, 1);
        assert_eq!(stats.pending_dates, 2);
        assert_eq!(stats.orders_today, 2);
        assert_eq!(stats.uncategorized_products, 2);
    }
}
