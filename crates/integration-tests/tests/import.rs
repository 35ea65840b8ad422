//! CSV upload through the HTTP API.

use axum::http::StatusCode;
use vega_integration_tests::{TestApp, order_row, shopify_csv};

#[tokio::test]
async fn test_import_twice_inserts_nothing_new() {
    let app = TestApp::new().await;
    let csv = shopify_csv(&[
        &order_row("#2001", "Manzana", 3, "Ñuñoa", "2026-03-10"),
        &order_row("#2002", "Pera", 1, "Macul", "2026-03-11"),
    ]);

    let first = app.import(&csv).await;
    assert_eq!(first["success"], true);
    assert_eq!(first["inserted"], 2);
    assert_eq!(first["duplicates"], 0);

    let second = app.import(&csv).await;
    assert_eq!(second["inserted"], 0);
    assert_eq!(second["duplicates"], 2);
    assert_eq!(app.order_count().await, 2);
}

#[tokio::test]
async fn test_order_without_delivery_date_is_never_stored() {
    let app = TestApp::new().await;
    let csv = shopify_csv(&[
        &order_row("#2001", "Manzana", 3, "Ñuñoa", "2026-03-10"),
        "#2003,x@example.com,500,2026-03-08 10:00:00 -0300,1,Limón,500,,,,,,,Comuna de Entrega: Ñuñoa",
    ]);

    let summary = app.import(&csv).await;
    assert_eq!(summary["inserted"], 1);
    assert_eq!(summary["missing_date"], 1);

    let orders = app.get("/api/orders").await.json();
    let numbers: Vec<&str> = orders
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["order_number"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["#2001"]);
}

#[tokio::test]
async fn test_upload_rejects_wrong_extension() {
    let app = TestApp::new().await;
    let csv = shopify_csv(&[&order_row("#2001", "Manzana", 3, "Ñuñoa", "2026-03-10")]);

    let response = app
        .upload("/api/upload", "orders_export.xlsx", csv.as_bytes())
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.order_count().await, 0);
}

#[tokio::test]
async fn test_upload_without_required_columns_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .upload("/api/upload", "export.csv", b"Email,Total\na@b.cl,100\n")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_long_order_names_are_imported() {
    let app = TestApp::new().await;
    let name = format!("#{}", "7".repeat(90));
    let csv = shopify_csv(&[&order_row(&name, "Manzana", 1, "Ñuñoa", "2026-03-10")]);

    let summary = app.import(&csv).await;
    assert_eq!(summary["inserted"], 1);
    assert!(app.order_id(&name).await > 0);
}
