use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use merx_api::{app, AppState};
use merx_catalog::PricingConfig;
use merx_core::{CustomerRecord, LogPublisher, StockRecord};
use merx_order::LedgerEngine;
use merx_store::MemoryStore;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

struct TestShop {
    router: Router,
    store: MemoryStore,
    shop_id: Uuid,
    customer_id: Uuid,
    product_id: Uuid,
}

async fn test_shop() -> TestShop {
    let store = MemoryStore::new();
    let shop_id = Uuid::new_v4();
    let customer_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();

    store
        .add_product(StockRecord {
            product_id,
            shop_id,
            name: "Widget".to_string(),
            description: Some("Blue".to_string()),
            unit_price: dec!(10.00),
            stock_quantity: 5,
            is_active: true,
        })
        .await;
    store
        .add_customer(CustomerRecord {
            id: customer_id,
            shop_id,
            name: "Lena".to_string(),
            email: Some("lena@example.com".to_string().into()),
            phone: None,
        })
        .await;

    let engine = LedgerEngine::new(
        Arc::new(store.clone()),
        Arc::new(LogPublisher),
        PricingConfig::default(),
    );

    TestShop {
        router: app(AppState::new(engine)),
        store,
        shop_id,
        customer_id,
        product_id,
    }
}

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn order_body(shop: &TestShop, quantity: i32) -> Value {
    json!({
        "shop_id": shop.shop_id,
        "customer_id": shop.customer_id,
        "items": [{ "product_id": shop.product_id, "quantity": quantity }],
        "payment_method": "cash",
        "notes": null
    })
}

#[tokio::test]
async fn test_health() {
    let shop = test_shop().await;
    let (status, body) = call(&shop.router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_order_lifecycle_over_http() {
    let shop = test_shop().await;

    let (status, order) = call(&shop.router, Method::POST, "/v1/orders", Some(order_body(&shop, 3))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["grand_total"], "32.40");
    assert_eq!(order["items"][0]["product_snapshot"]["name"], "Widget");

    let stock_uri = format!("/v1/products/{}/stock", shop.product_id);
    let (_, stock) = call(&shop.router, Method::GET, &stock_uri, None).await;
    assert_eq!(stock["stock_quantity"], 2);

    let (status, error) = call(&shop.router, Method::POST, "/v1/orders", Some(order_body(&shop, 3))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "insufficient_stock");
    assert_eq!(error["details"]["requested"], 3);
    assert_eq!(error["details"]["available"], 2);

    let order_id = order["id"].as_str().unwrap();
    let status_uri = format!("/v1/orders/{}/status", order_id);
    let (status, cancelled) = call(
        &shop.router,
        Method::POST,
        &status_uri,
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (_, stock) = call(&shop.router, Method::GET, &stock_uri, None).await;
    assert_eq!(stock["stock_quantity"], 5);

    let (status, error) = call(
        &shop.router,
        Method::POST,
        &status_uri,
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "invalid_transition");
    assert_eq!(error["details"]["from"], "cancelled");
}

#[tokio::test]
async fn test_bad_requests() {
    let shop = test_shop().await;

    let (status, error) = call(&shop.router, Method::POST, "/v1/orders", Some(order_body(&shop, 0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "invalid_order");

    let (status, error) = call(
        &shop.router,
        Method::POST,
        "/v1/orders",
        Some(json!({ "shop_id": "not-a-uuid" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "bad_request");

    let uri = format!("/v1/shops/{}/orders?status=paid", shop.shop_id);
    let (status, _) = call(&shop.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/v1/orders/{}", Uuid::new_v4());
    let (status, error) = call(&shop.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "not_found");
}

#[tokio::test]
async fn test_credit_payment_and_summary() {
    let shop = test_shop().await;
    let base = format!("/v1/customers/{}", shop.customer_id);

    for amount in ["100", "50"] {
        let (status, credit) = call(
            &shop.router,
            Method::POST,
            &format!("{}/credits", base),
            Some(json!({ "amount": amount, "description": "tab" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(credit["payment_method"], "credit");
    }

    let (_, balance) = call(&shop.router, Method::GET, &format!("{}/balance", base), None).await;
    assert_eq!(balance["balance"], "150.00");

    let (status, result) = call(
        &shop.router,
        Method::POST,
        &format!("{}/payments", base),
        Some(json!({ "amount": 120 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["orders"].as_array().unwrap().len(), 2);
    assert_eq!(result["remaining_balance"], "30.00");

    let (status, error) = call(
        &shop.router,
        Method::POST,
        &format!("{}/payments", base),
        Some(json!({ "amount": "-5" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "invalid_amount");

    let (_, summary) = call(&shop.router, Method::GET, &format!("{}/summary", base), None).await;
    assert_eq!(summary["pending_orders"], 1);
    assert_eq!(summary["order_count"], 1);
    assert_eq!(summary["total_spent"], "100.00");

    let (_, pending) = call(
        &shop.router,
        Method::GET,
        &format!("{}/orders?status=pending", base),
        None,
    )
    .await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_falls_back_to_soft_delete() {
    let shop = test_shop().await;
    let (_, order) = call(&shop.router, Method::POST, "/v1/orders", Some(order_body(&shop, 1))).await;
    let order_id: Uuid = order["id"].as_str().unwrap().parse().unwrap();
    shop.store.restrict_hard_delete(order_id).await;

    let uri = format!("/v1/orders/{}", order_id);
    let (status, outcome) = call(&shop.router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "reclassified");
    assert_eq!(outcome["status"], "deleted");

    let (status, fetched) = call(&shop.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "deleted");
    assert_eq!(fetched["notes"], "[DELETED]");

    let list_uri = format!("/v1/shops/{}/orders", shop.shop_id);
    let (_, listed) = call(&shop.router, Method::GET, &list_uri, None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (_, deleted) = call(&shop.router, Method::GET, &format!("{}?status=deleted", list_uri), None).await;
    assert_eq!(deleted.as_array().unwrap().len(), 1);
}
