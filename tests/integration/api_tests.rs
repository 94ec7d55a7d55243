use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use price_tracer::web::{create_router, AppState};
use serde_json::Value;
use tower::ServiceExt;

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_stats_reflect_completed_ticks() {
    let engine = create_test_engine();
    engine
        .product_manager
        .add_product("https://shop.example/a", Decimal::from(100), 1)
        .await;
    engine
        .product_manager
        .add_product("https://shop.example/b", Decimal::from(100), 1)
        .await;
    engine.fetcher.set_price("https://shop.example/a", 120);

    let scheduler = Arc::new(create_test_scheduler(&engine, 0, CancellationToken::new()));
    scheduler.run_tick().await;

    let app = create_router(AppState {
        product_manager: Arc::clone(&engine.product_manager),
        scheduler: Arc::clone(&scheduler),
    });
    let (status, body) = get_json(app, "/api/v1/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["tracked_products"], 2);
    assert_eq!(body["data"]["scheduler"]["ticks"], 1);
    assert_eq!(body["data"]["scheduler"]["succeeded"], 1);
    assert_eq!(body["data"]["scheduler"]["failed"], 1);
}

#[tokio::test]
async fn test_products_endpoint_shows_observed_price() {
    let engine = create_test_engine();
    engine
        .product_manager
        .add_product("https://shop.example/a", Decimal::new(9950, 2), 42)
        .await;
    engine.fetcher.set_price("https://shop.example/a", 120);

    let scheduler = Arc::new(create_test_scheduler(&engine, 0, CancellationToken::new()));
    scheduler.run_tick().await;

    let app = create_router(AppState {
        product_manager: Arc::clone(&engine.product_manager),
        scheduler,
    });

    let (status, body) = get_json(app.clone(), "/api/v1/products?chat=42").await;
    assert_eq!(status, StatusCode::OK);
    let products = body["data"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["owner_chat"], 42);
    assert_eq!(products[0]["last_observed_price"].as_f64(), Some(120.0));
    assert_eq!(products[0]["target_price"].as_f64(), Some(99.5));

    let (status, body) = get_json(app, "/api/v1/products?chat=7").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_health_endpoint() {
    let engine = create_test_engine();
    let scheduler = Arc::new(create_test_scheduler(&engine, 0, CancellationToken::new()));
    let app = create_router(AppState {
        product_manager: Arc::clone(&engine.product_manager),
        scheduler,
    });

    let (status, body) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}
