//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the database pool.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: SqlitePool,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: Arc::new(AppStateInner { pool }),
        }
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }
}
