//! Liveness and readiness endpoints.

use axum::http::StatusCode;
use vega_integration_tests::TestApp;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn test_readiness_checks_database() {
    let app = TestApp::new().await;
    assert_eq!(app.get("/health/ready").await.status, StatusCode::OK);

    app.pool.close().await;
    assert_eq!(
        app.get("/health/ready").await.status,
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_dashboard_on_empty_store() {
    let app = TestApp::new().await;

    let response = app.get("/api/dashboard").await;
    assert_eq!(response.status, StatusCode::OK);
    let stats = response.json();
    assert_eq!(stats["pending_orders"], 0);
    assert_eq!(stats["uncategorized_products"], 0);
}
