//! Order repository: queries, inserts and lifecycle transitions.
//!
//! Inserts used by import and restore take a `&mut SqliteConnection` so the
//! caller can run them inside its own transaction.

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use vega_core::{OrderId, OrderLineId, OrderNumber, OrderStatus};

use super::{RepositoryError, parse_stored_decimal};
use crate::models::{NewOrder, NewOrderLine, Order, OrderLine, OrderWithLines, StatusCounts};

const ORDER_COLUMNS: &str = "id, order_number, email, delivery_zone, delivery_date, \
     original_delivery_date, address, phone, customer_name, total, created_at, \
     imported_at, status, completed_at";

/// Which statuses an order listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Every order.
    #[default]
    All,
    /// Pending or postponed.
    Active,
    /// Exactly one status.
    Exact(OrderStatus),
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    /// Accepts `all`, `active` (legacy: `activos`) or any order status.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "active" | "activos" => Ok(Self::Active),
            other => other.parse().map(Self::Exact),
        }
    }
}

/// Filter for [`OrderRepository::list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub delivery_date: Option<NaiveDate>,
    pub status: StatusFilter,
}

impl OrderFilter {
    /// Active orders for one delivery date (what reports operate on).
    #[must_use]
    pub const fn active_on(date: NaiveDate) -> Self {
        Self {
            delivery_date: Some(date),
            status: StatusFilter::Active,
        }
    }
}

/// Internal row type for database queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    email: Option<String>,
    delivery_zone: Option<String>,
    delivery_date: Option<NaiveDate>,
    original_delivery_date: Option<NaiveDate>,
    address: Option<String>,
    phone: Option<String>,
    customer_name: Option<String>,
    total: Option<String>,
    created_at: Option<NaiveDateTime>,
    imported_at: Option<NaiveDateTime>,
    status: OrderStatus,
    completed_at: Option<NaiveDateTime>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let order_number = OrderNumber::parse(&row.order_number).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order number in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            order_number,
            email: row.email,
            delivery_zone: row.delivery_zone,
            delivery_date: row.delivery_date,
            original_delivery_date: row.original_delivery_date,
            address: row.address,
            phone: row.phone,
            customer_name: row.customer_name,
            total: parse_stored_decimal(row.total.as_deref(), "orders.total")?,
            created_at: row.created_at,
            imported_at: row.imported_at,
            status: row.status,
            completed_at: row.completed_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: OrderLineId,
    order_id: OrderId,
    product: String,
    quantity: i64,
    price: Option<String>,
    sku: Option<String>,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product: row.product,
            quantity: row.quantity,
            price: parse_stored_decimal(row.price.as_deref(), "order_lines.price")?,
            sku: row.sku,
        })
    }
}

/// A line item joined with its order number, as written to backups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupLine {
    pub order_id: OrderId,
    pub order_number: String,
    pub line: NewOrderLine,
}

#[derive(Debug, sqlx::FromRow)]
struct BackupLineRow {
    order_id: OrderId,
    order_number: String,
    product: String,
    quantity: i64,
    price: Option<String>,
    sku: Option<String>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an order by its order number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_number(&self, number: &str) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = ?"
        ))
        .bind(number)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List orders with their lines, ordered by delivery date then order number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, filter: OrderFilter) -> Result<Vec<OrderWithLines>, RepositoryError> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1 = 1"));

        if let Some(date) = filter.delivery_date {
            query.push(" AND delivery_date = ").push_bind(date);
        }
        match filter.status {
            StatusFilter::All => {}
            StatusFilter::Active => {
                query.push(" AND status IN ('pending', 'postponed')");
            }
            StatusFilter::Exact(status) => {
                query.push(" AND status = ").push_bind(status);
            }
        }
        query.push(" ORDER BY delivery_date, order_number");

        let rows = query
            .build_query_as::<OrderRow>()
            .fetch_all(self.pool)
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let order = Order::try_from(row)?;
            let lines = self.lines(order.id).await?;
            orders.push(OrderWithLines { order, lines });
        }
        Ok(orders)
    }

    /// Line items of one order, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT id, order_id, product, quantity, price, sku
            FROM order_lines
            WHERE order_id = ?
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Every order, ordered by delivery date (backup export order).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY delivery_date, id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Every line item with the number of the order that owns it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_lines(&self) -> Result<Vec<BackupLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, BackupLineRow>(
            r"
            SELECT l.order_id, o.order_number, l.product, l.quantity, l.price, l.sku
            FROM order_lines l
            JOIN orders o ON l.order_id = o.id
            ORDER BY l.order_id, l.id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(BackupLine {
                    order_id: row.order_id,
                    order_number: row.order_number,
                    line: NewOrderLine {
                        product: row.product,
                        quantity: row.quantity,
                        price: parse_stored_decimal(row.price.as_deref(), "order_lines.price")?,
                        sku: row.sku,
                    },
                })
            })
            .collect()
    }

    /// Number of orders in each status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_counts(&self) -> Result<StatusCounts, RepositoryError> {
        let rows: Vec<(OrderStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .fetch_all(self.pool)
                .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            counts.add(status, count);
        }
        Ok(counts)
    }

    /// Mark an order as completed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this ID.
    pub async fn complete(&self, id: OrderId, now: NaiveDateTime) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'completed', completed_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(id)
        .execute(self.pool)
        .await?;

        expect_one(result.rows_affected())
    }

    /// Move an order to a new delivery date and mark it postponed.
    ///
    /// The original delivery date is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this ID.
    pub async fn postpone(&self, id: OrderId, new_date: NaiveDate) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET delivery_date = ?, status = 'postponed' WHERE id = ?",
        )
        .bind(new_date)
        .bind(id)
        .execute(self.pool)
        .await?;

        expect_one(result.rows_affected())
    }

    /// Put an order back to pending and clear its completion time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this ID.
    pub async fn reactivate(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'pending', completed_at = NULL WHERE id = ?",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        expect_one(result.rows_affected())
    }

    /// Complete every pending order whose delivery date is before `today`.
    ///
    /// Postponed and completed orders are never touched. Returns the number
    /// of orders completed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn auto_complete_past(
        &self,
        today: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = 'completed', completed_at = ?
            WHERE status = 'pending' AND delivery_date < ?
            ",
        )
        .bind(now)
        .bind(today)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete an order and its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this ID.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM order_lines WHERE order_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        expect_one(result.rows_affected())?;

        tx.commit().await?;
        Ok(())
    }
}

fn expect_one(rows_affected: u64) -> Result<(), RepositoryError> {
    if rows_affected == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

/// Look up an order ID by order number.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_id_by_number(
    conn: &mut SqliteConnection,
    number: &str,
) -> Result<Option<OrderId>, RepositoryError> {
    let id = sqlx::query_scalar::<_, OrderId>("SELECT id FROM orders WHERE order_number = ?")
        .bind(number)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

/// Insert an order and all of its lines.
///
/// The original delivery date falls back to the delivery date when unset.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order number already exists.
pub async fn insert_order(
    conn: &mut SqliteConnection,
    order: &NewOrder,
    completed_at: Option<NaiveDateTime>,
) -> Result<OrderId, RepositoryError> {
    let original = order.original_delivery_date.or(order.delivery_date);

    let id = sqlx::query_scalar::<_, OrderId>(
        r"
        INSERT INTO orders (
            order_number, email, delivery_zone, delivery_date, original_delivery_date,
            address, phone, customer_name, total, created_at, imported_at, status,
            completed_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP), ?, ?)
        RETURNING id
        ",
    )
    .bind(order.order_number.as_str())
    .bind(order.email.as_deref())
    .bind(order.delivery_zone.as_deref())
    .bind(order.delivery_date)
    .bind(original)
    .bind(order.address.as_deref())
    .bind(order.phone.as_deref())
    .bind(order.customer_name.as_deref())
    .bind(order.total.to_string())
    .bind(order.created_at)
    .bind(order.imported_at)
    .bind(order.status)
    .bind(completed_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        RepositoryError::from_unique(e, format!("order {} already exists", order.order_number))
    })?;

    for line in &order.lines {
        insert_line(&mut *conn, id, line).await?;
    }

    Ok(id)
}

/// Insert one line item for an existing order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_line(
    conn: &mut SqliteConnection,
    order_id: OrderId,
    line: &NewOrderLine,
) -> Result<OrderLineId, RepositoryError> {
    let id = sqlx::query_scalar::<_, OrderLineId>(
        r"
        INSERT INTO order_lines (order_id, product, quantity, price, sku)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        ",
    )
    .bind(order_id)
    .bind(&line.product)
    .bind(line.quantity)
    .bind(line.price.to_string())
    .bind(line.sku.as_deref())
    .fetch_one(conn)
    .await?;

    Ok(id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::create_memory_pool;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn noon(d: NaiveDate) -> NaiveDateTime {
        d.and_hms_opt(12, 0, 0).unwrap()
    }

    fn new_order(number: &str, delivery: &str, status: OrderStatus) -> NewOrder {
        let mut order = NewOrder::new(OrderNumber::parse(number).unwrap());
        order.delivery_date = Some(date(delivery));
        order.customer_name = Some("Ana".to_string());
        order.total = Decimal::new(15_990, 0);
        order.status = status;
        order.lines = vec![NewOrderLine {
            product: "Palta Hass".to_string(),
            quantity: 2,
            price: Decimal::new(4_990, 0),
            sku: None,
        }];
        order
    }

    async fn seed(pool: &SqlitePool, order: &NewOrder) -> OrderId {
        let mut conn = pool.acquire().await.unwrap();
        insert_order(&mut conn, order, None).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let pool = create_memory_pool().await.unwrap();
        let id = seed(&pool, &new_order("#1001", "2026-03-10", OrderStatus::Pending)).await;

        let repo = OrderRepository::new(&pool);
        let order = repo.get(id).await.unwrap().unwrap();
        assert_eq!(order.order_number.as_str(), "#1001");
        assert_eq!(order.original_delivery_date, Some(date("2026-03-10")));
        assert_eq!(order.total, Decimal::new(15_990, 0));
        assert_eq!(order.status, OrderStatus::Pending);

        let lines = repo.lines(id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product, "Palta Hass");
    }

    #[tokio::test]
    async fn test_insert_duplicate_number_conflicts() {
        let pool = create_memory_pool().await.unwrap();
        let order = new_order("#1001", "2026-03-10", OrderStatus::Pending);
        seed(&pool, &order).await;

        let mut conn = pool.acquire().await.unwrap();
        let err = insert_order(&mut conn, &order, None).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_postpone_keeps_original_date() {
        let pool = create_memory_pool().await.unwrap();
        let id = seed(&pool, &new_order("#1001", "2026-03-10", OrderStatus::Pending)).await;
        let repo = OrderRepository::new(&pool);

        repo.postpone(id, date("2026-03-14")).await.unwrap();

        let order = repo.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Postponed);
        assert_eq!(order.delivery_date, Some(date("2026-03-14")));
        assert_eq!(order.original_delivery_date, Some(date("2026-03-10")));
        assert!(order.was_rescheduled());
    }

    #[tokio::test]
    async fn test_complete_then_reactivate() {
        let pool = create_memory_pool().await.unwrap();
        let id = seed(&pool, &new_order("#1001", "2026-03-10", OrderStatus::Pending)).await;
        let repo = OrderRepository::new(&pool);

        repo.complete(id, noon(date("2026-03-10"))).await.unwrap();
        let order = repo.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.completed_at.is_some());

        repo.reactivate(id).await.unwrap();
        let order = repo.get(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_transitions_on_missing_order() {
        let pool = create_memory_pool().await.unwrap();
        let repo = OrderRepository::new(&pool);
        let missing = OrderId::new(404);

        assert!(matches!(
            repo.complete(missing, noon(date("2026-03-10"))).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            repo.postpone(missing, date("2026-03-10")).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(repo.delete(missing).await, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_auto_complete_only_touches_past_pending() {
        let pool = create_memory_pool().await.unwrap();
        let past_pending =
            seed(&pool, &new_order("#1", "2026-03-01", OrderStatus::Pending)).await;
        let past_postponed =
            seed(&pool, &new_order("#2", "2026-03-01", OrderStatus::Postponed)).await;
        let today_pending =
            seed(&pool, &new_order("#3", "2026-03-10", OrderStatus::Pending)).await;
        let future_pending =
            seed(&pool, &new_order("#4", "2026-03-20", OrderStatus::Pending)).await;

        let repo = OrderRepository::new(&pool);
        let today = date("2026-03-10");
        let affected = repo.auto_complete_past(today, noon(today)).await.unwrap();
        assert_eq!(affected, 1);

        for (id, expected) in [
            (past_pending, OrderStatus::Completed),
            (past_postponed, OrderStatus::Postponed),
            (today_pending, OrderStatus::Pending),
            (future_pending, OrderStatus::Pending),
        ] {
            let order = repo.get(id).await.unwrap().unwrap();
            assert_eq!(order.status, expected, "order {}", order.order_number);
        }
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let pool = create_memory_pool().await.unwrap();
        seed(&pool, &new_order("#2002", "2026-03-10", OrderStatus::Pending)).await;
        seed(&pool, &new_order("#2001", "2026-03-10", OrderStatus::Postponed)).await;
        seed(&pool, &new_order("#2003", "2026-03-10", OrderStatus::Completed)).await;
        seed(&pool, &new_order("#1999", "2026-03-11", OrderStatus::Pending)).await;

        let repo = OrderRepository::new(&pool);

        let active = repo
            .list(OrderFilter::active_on(date("2026-03-10")))
            .await
            .unwrap();
        let numbers: Vec<_> = active.iter().map(|o| o.order.order_number.as_str()).collect();
        assert_eq!(numbers, ["#2001", "#2002"]);
        assert!(active.iter().all(|o| o.lines.len() == 1));

        let all = repo.list(OrderFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[3].order.order_number.as_str(), "#1999");

        let completed = repo
            .list(OrderFilter {
                delivery_date: None,
                status: StatusFilter::Exact(OrderStatus::Completed),
            })
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_lines() {
        let pool = create_memory_pool().await.unwrap();
        let id = seed(&pool, &new_order("#1001", "2026-03-10", OrderStatus::Pending)).await;
        let repo = OrderRepository::new(&pool);

        repo.delete(id).await.unwrap();

        assert!(repo.get(id).await.unwrap().is_none());
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_lines")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_status_counts() {
        let pool = create_memory_pool().await.unwrap();
        seed(&pool, &new_order("#1", "2026-03-10", OrderStatus::Pending)).await;
        seed(&pool, &new_order("#2", "2026-03-10", OrderStatus::Pending)).await;
        seed(&pool, &new_order("#3", "2026-03-10", OrderStatus::Completed)).await;

        let counts = OrderRepository::new(&pool).status_counts().await.unwrap();
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.postponed, 0);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!("active".parse(), Ok(StatusFilter::Active));
        assert_eq!("activos".parse(), Ok(StatusFilter::Active));
        assert_eq!("all".parse(), Ok(StatusFilter::All));
        assert_eq!(
            "postponed".parse(),
            Ok(StatusFilter::Exact(OrderStatus::Postponed))
        );
        assert!("shipped".parse::<StatusFilter>().is_err());
    }
}
