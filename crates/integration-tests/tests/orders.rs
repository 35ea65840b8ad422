//! Order listing and lifecycle transitions.

use axum::http::StatusCode;
use serde_json::json;
use vega_integration_tests::{TestApp, order_row, shopify_csv};

async fn seeded() -> TestApp {
    let app = TestApp::new().await;
    app.import(&shopify_csv(&[
        &order_row("#3001", "Manzana", 2, "Ñuñoa", "2020-01-10"),
        &order_row("#3002", "Pera", 1, "Macul", "2020-01-10"),
        &order_row("#3003", "Kiwi", 4, "Ñuñoa", "2099-12-31"),
    ]))
    .await;
    app
}

#[tokio::test]
async fn test_postpone_keeps_original_date() {
    let app = seeded().await;
    let id = app.order_id("#3001").await;

    let response = app
        .post_json(
            &format!("/api/orders/{id}/postpone"),
            &json!({ "new_date": "2099-12-30" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let orders = app.get("/api/orders?status=postponed").await.json();
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["order_number"], "#3001");
    assert_eq!(orders[0]["delivery_date"], "2099-12-30");
    assert_eq!(orders[0]["original_delivery_date"], "2020-01-10");
    assert_eq!(orders[0]["lines"][0]["product"], "Manzana");
}

#[tokio::test]
async fn test_auto_complete_only_touches_past_pending_orders() {
    let app = seeded().await;
    let postponed = app.order_id("#3002").await;
    // Postponed to another past date: stays postponed.
    app.post_json(
        &format!("/api/orders/{postponed}/postpone"),
        &json!({ "new_date": "2020-01-11" }),
    )
    .await;

    let response = app.post("/api/orders/auto-complete").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["completed"], 1);

    let completed = app.get("/api/orders?status=completed").await.json();
    assert_eq!(completed.as_array().unwrap().len(), 1);
    assert_eq!(completed[0]["order_number"], "#3001");
    assert!(completed[0]["completed_at"].is_string());

    let active = app.get("/api/orders?status=active").await.json();
    let numbers: Vec<&str> = active
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["order_number"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["#3002", "#3003"]);
}

#[tokio::test]
async fn test_complete_and_reactivate() {
    let app = seeded().await;
    let id = app.order_id("#3003").await;

    app.post(&format!("/api/orders/{id}/complete")).await;
    let orders = app.get("/api/orders?date=2099-12-31").await.json();
    assert_eq!(orders[0]["status"], "completed");

    app.post(&format!("/api/orders/{id}/reactivate")).await;
    let orders = app.get("/api/orders?date=2099-12-31").await.json();
    assert_eq!(orders[0]["status"], "pending");
    assert!(orders[0]["completed_at"].is_null());
}

#[tokio::test]
async fn test_pending_dates() {
    let app = seeded().await;

    let dates = app.get("/api/orders/dates").await.json();
    let dates = dates.as_array().unwrap();
    assert_eq!(dates.len(), 2);
    assert_eq!(dates[0]["date"], "2020-01-10");
    assert_eq!(dates[0]["orders"], 2);
    assert_eq!(dates[1]["date"], "2099-12-31");
}

#[tokio::test]
async fn test_delete_order() {
    let app = seeded().await;
    let id = app.order_id("#3002").await;

    assert_eq!(
        app.delete(&format!("/api/orders/{id}")).await.status,
        StatusCode::OK
    );
    assert_eq!(app.order_count().await, 2);
    assert_eq!(
        app.delete(&format!("/api/orders/{id}")).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_bad_parameters_are_rejected() {
    let app = seeded().await;
    let id = app.order_id("#3001").await;

    let response = app
        .post_json(
            &format!("/api/orders/{id}/postpone"),
            &json!({ "new_date": "31/12/2099" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    assert_eq!(
        app.get("/api/orders?date=yesterday").await.status,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.get("/api/orders?status=shipped").await.status,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.post("/api/orders/99999/complete").await.status,
        StatusCode::NOT_FOUND
    );
}
