//! Integration tests for La Vega.
//!
//! Each test builds the full router on a private in-memory SQLite database
//! and drives it with `tower::ServiceExt::oneshot`, so no server or
//! external database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vega-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use axum::{
    Router,
    body::{Body, Bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

use vega_admin::db::create_memory_pool;
use vega_admin::state::AppState;

const BOUNDARY: &str = "vega-test-boundary";

/// Header row of a Shopify orders export.
pub const CSV_HEADER: &str = "Name,Email,Total,Created at,Lineitem quantity,Lineitem name,Lineitem price,Lineitem sku,Billing Name,Shipping Name,Shipping Address1,Shipping Phone,Phone,Note Attributes";

/// Build a Shopify export from data rows.
#[must_use]
pub fn shopify_csv(rows: &[&str]) -> String {
    let mut text = String::from(CSV_HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text
}

/// A single-line order row with delivery notes.
#[must_use]
pub fn order_row(number: &str, product: &str, quantity: i64, zone: &str, date: &str) -> String {
    format!(
        "{number},cliente@example.com,10000,2026-03-08 10:00:00 -0300,{quantity},{product},1000,,Cliente,Cliente {number},Calle 1,,,\"Comuna de Entrega: {zone}\nFecha de Entrega: {date}\""
    )
}

/// A response captured for assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Parse the body as JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The application under test with its database.
pub struct TestApp {
    pub pool: SqlitePool,
    router: Router,
}

impl TestApp {
    /// Build the router on a fresh, migrated in-memory database.
    pub async fn new() -> Self {
        let pool = create_memory_pool().await.unwrap();
        let router = vega_admin::app(AppState::new(pool.clone()));
        Self { pool, router }
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::DELETE)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post(&self, uri: &str) -> TestResponse {
        self.send(Request::post(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.json_request(Method::POST, uri, body).await
    }

    pub async fn put_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.json_request(Method::PUT, uri, body).await
    }

    async fn json_request(&self, method: Method, uri: &str, body: &Value) -> TestResponse {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Upload a file in the `file` field of a multipart form.
    pub async fn upload(&self, uri: &str, filename: &str, content: &[u8]) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        self.send(
            Request::post(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// Upload a Shopify export and return the import summary.
    pub async fn import(&self, csv: &str) -> Value {
        let response = self.upload("/api/upload", "orders_export.csv", csv.as_bytes()).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text());
        response.json()
    }

    /// Number of stored orders.
    pub async fn order_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// ID of the order with this number.
    pub async fn order_id(&self, number: &str) -> i64 {
        sqlx::query_scalar("SELECT id FROM orders WHERE order_number = ?")
            .bind(number)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}
