//! Category repository and the product → category mapping.

use sqlx::{SqliteConnection, SqlitePool};

use vega_core::CategoryId;

use super::RepositoryError;
use crate::models::{Category, ProductMapping};

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List all categories by display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, display_order FROM categories ORDER BY display_order, name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, display_order FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// Create a category placed after every existing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is already taken.
    pub async fn create(&self, name: &str) -> Result<Category, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            r"
            INSERT INTO categories (name, display_order)
            VALUES (?, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM categories))
            RETURNING id, name, display_order
            ",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, format!("category {name:?} already exists")))?;

        tracing::info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Rename and/or reorder a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist and
    /// `RepositoryError::Conflict` if the new name is already taken.
    pub async fn update(
        &self,
        id: CategoryId,
        name: Option<&str>,
        display_order: Option<i64>,
    ) -> Result<Category, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            r"
            UPDATE categories
            SET name = COALESCE(?, name), display_order = COALESCE(?, display_order)
            WHERE id = ?
            RETURNING id, name, display_order
            ",
        )
        .bind(name)
        .bind(display_order)
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "category name already exists"))?;

        category.ok_or(RepositoryError::NotFound)
    }

    /// Delete a category. Its products become uncategorized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let unmapped = sqlx::query("DELETE FROM product_categories WHERE category_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        tracing::info!(category_id = %id, unmapped, "Category deleted");
        Ok(())
    }

    /// Map a product to a category, replacing any previous mapping.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn assign(
        &self,
        product: &str,
        category_id: CategoryId,
    ) -> Result<(), RepositoryError> {
        if self.get(category_id).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            r"
            INSERT INTO product_categories (product, category_id)
            VALUES (?, ?)
            ON CONFLICT (product) DO UPDATE SET category_id = excluded.category_id
            ",
        )
        .bind(product)
        .bind(category_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Distinct products on order lines that have no category, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn uncategorized_products(&self) -> Result<Vec<String>, RepositoryError> {
        let products = sqlx::query_scalar::<_, String>(
            r"
            SELECT DISTINCT l.product
            FROM order_lines l
            LEFT JOIN product_categories pc ON l.product = pc.product
            WHERE pc.id IS NULL
            ORDER BY l.product
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Every product mapping, with the category name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mappings(&self) -> Result<Vec<ProductMapping>, RepositoryError> {
        let mappings = sqlx::query_as::<_, ProductMapping>(
            r"
            SELECT pc.product, c.name AS category
            FROM product_categories pc
            JOIN categories c ON pc.category_id = c.id
            ORDER BY pc.product
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(mappings)
    }
}

/// Insert a category unless one with the same name exists.
///
/// Returns true if a row was inserted.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_if_absent(
    conn: &mut SqliteConnection,
    name: &str,
    display_order: i64,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("INSERT OR IGNORE INTO categories (name, display_order) VALUES (?, ?)")
        .bind(name)
        .bind(display_order)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Map a product to the named category unless the product is already mapped.
///
/// Returns true if a mapping was inserted. Unknown category names are ignored.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn map_if_absent(
    conn: &mut SqliteConnection,
    product: &str,
    category_name: &str,
) -> Result<bool, RepositoryError> {
    let category_id =
        sqlx::query_scalar::<_, CategoryId>("SELECT id FROM categories WHERE name = ?")
            .bind(category_name)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(category_id) = category_id else {
        return Ok(false);
    };

    let result = sqlx::query(
        "INSERT OR IGNORE INTO product_categories (product, category_id) VALUES (?, ?)",
    )
    .bind(product)
    .bind(category_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
