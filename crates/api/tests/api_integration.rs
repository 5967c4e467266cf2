//! Integration tests for the API server.

use std::sync::OnceLock;

use api::seed::CatalogSeed;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use inventory::{InMemoryCatalog, InMemoryStockLedger, StockLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const CATALOG: &str = r#"{
    "items": [
        { "id": "main", "name": "main", "price": 0, "groups": [{ "id": "type", "name": "type" }] },
        { "id": "burger", "name": "burger", "price": 500, "stock_id": "burger" },
        { "id": "wrap", "name": "wrap", "price": 330, "stock_id": "wrap" }
    ],
    "groups": [
        { "id": "type", "name": "type", "min_option": 1, "max_option": 1, "min_item": 1, "max_item": 1 }
    ],
    "stock": [
        { "id": "burger", "amount": 10 },
        { "id": "wrap", "amount": 5 }
    ]
}"#;

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup_with_ledger() -> (Router, InMemoryStockLedger) {
    let catalog = InMemoryCatalog::new();
    let ledger = InMemoryStockLedger::new();
    CatalogSeed::from_json(CATALOG)
        .unwrap()
        .load_in_memory(&catalog, &ledger)
        .await
        .unwrap();

    let state = api::create_in_memory_state(catalog, ledger.clone());
    (api::create_app(state, get_metrics_handle()), ledger)
}

async fn setup() -> Router {
    setup_with_ledger().await.0
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn create_order(app: &Router) -> String {
    let (status, json) = send(app, "POST", "/orders", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    json["order_id"].as_str().unwrap().to_string()
}

async fn add_main(app: &Router, order_id: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("/orders/{order_id}/items"),
        Some(json!({ "item_id": "main", "quantity": 1 })),
    )
    .await
}

async fn fill(app: &Router, order_id: &str, path: &str, item: &str, count: u32) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("/orders/{order_id}/groups/{path}"),
        Some(json!({ "item_ids": [item], "counts": [count] })),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let app = setup().await;

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["backend"], "memory");
}

#[tokio::test]
async fn test_create_and_get_order() {
    let app = setup().await;
    let user_id = uuid::Uuid::new_v4().to_string();

    let (status, created) = send(&app, "POST", "/orders", Some(json!({ "user_id": user_id }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "created");
    let order_id = created["order_id"].as_str().unwrap();

    let (status, order) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["id"], order_id);
    assert_eq!(order["user_id"], user_id.as_str());
    assert_eq!(order["status"], "created");
    assert_eq!(order["price_cents"], 0);
    assert_eq!(order["price"], "$0.00");
    assert_eq!(order["tree"], json!([]));
    assert_eq!(order["version"], 1);
}

#[tokio::test]
async fn test_full_order_flow() {
    let (app, ledger) = setup_with_ledger().await;
    let order_id = create_order(&app).await;

    let (status, result) = add_main(&app, &order_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["price_added_cents"], 0);
    assert_eq!(result["order"]["tree"][0]["name"], "main");
    assert_eq!(result["order"]["tree"][0]["children"][0]["fulfilled"], false);

    let (status, missing) = send(&app, "GET", &format!("/orders/{order_id}/unfulfilled"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(missing["path"], "0.0");
    assert_eq!(missing["item_name"], "main");
    assert_eq!(missing["group_id"], "type");

    let (status, result) = fill(&app, &order_id, "0.0", "burger", 1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["price_added"], "$5.00");
    assert_eq!(result["order"]["price_cents"], 500);

    let (status, details) = send(&app, "GET", &format!("/orders/{order_id}/details"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        details["details"],
        "main\n  type:burger ......$5.00\n\n\nTotal price: $5.00"
    );

    add_main(&app, &order_id).await;
    let (status, result) = fill(&app, &order_id, "1.0", "wrap", 1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["order"]["price_cents"], 830);

    let (_, missing) = send(&app, "GET", &format!("/orders/{order_id}/unfulfilled"), None).await;
    assert!(missing.is_null());

    let (status, paid) = send(&app, "POST", &format!("/orders/{order_id}/pay"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
    assert_eq!(ledger.amount(&"burger".into()).await.unwrap(), 9);
    assert_eq!(ledger.amount(&"wrap".into()).await.unwrap(), 4);

    let (status, ready) = send(&app, "POST", &format!("/orders/{order_id}/ready"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready["status"], "ready");
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let app = setup().await;
    let fake_id = uuid::Uuid::new_v4();

    let (status, json) = send(&app, "GET", &format!("/orders/{fake_id}"), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_invalid_id_format() {
    let app = setup().await;

    let (status, json) = send(&app, "GET", "/orders/not-a-uuid", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Invalid order id"));
}

#[tokio::test]
async fn test_validation_errors_are_unprocessable() {
    let app = setup().await;
    let order_id = create_order(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/items"),
        Some(json!({ "item_id": "main", "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Too many separate units for one request
    let (status, json) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/items"),
        Some(json!({ "item_id": "main", "quantity": 4_000_000_000u32 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("at most"));

    add_main(&app, &order_id).await;
    let (status, _) = fill(&app, &order_id, "0.0", "burger", 2).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, order) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(order["tree"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_references_are_not_found() {
    let app = setup().await;
    let order_id = create_order(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/items"),
        Some(json!({ "item_id": "pizza", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    add_main(&app, &order_id).await;
    let (status, _) = fill(&app, &order_id, "3.0", "burger", 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_conflicts() {
    let app = setup().await;
    let order_id = create_order(&app).await;
    add_main(&app, &order_id).await;

    // Paying an incomplete order
    let (status, _) = send(&app, "POST", &format!("/orders/{order_id}/pay"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    fill(&app, &order_id, "0.0", "burger", 1).await;

    // Filling the same group twice
    let (status, _) = fill(&app, &order_id, "0.0", "wrap", 1).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Ready before paid
    let (status, _) = send(&app, "POST", &format!("/orders/{order_id}/ready"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "POST", &format!("/orders/{order_id}/pay"), None).await;
    assert_eq!(status, StatusCode::OK);

    // Paying twice
    let (status, _) = send(&app, "POST", &format!("/orders/{order_id}/pay"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_insufficient_stock_is_conflict() {
    let (app, ledger) = setup_with_ledger().await;
    ledger.try_decrease(&"burger".into(), 10).await.unwrap();
    let order_id = create_order(&app).await;
    add_main(&app, &order_id).await;

    let (status, json) = fill(&app, &order_id, "0.0", "burger", 1).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("burger"));
}

#[tokio::test]
async fn test_list_orders() {
    let app = setup().await;
    let user_id = uuid::Uuid::new_v4().to_string();

    for _ in 0..2 {
        send(&app, "POST", "/orders", Some(json!({ "user_id": user_id }))).await;
    }
    create_order(&app).await;

    let (status, orders) = send(&app, "GET", &format!("/orders?user_id={user_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 2);

    let (status, orders) = send(&app, "GET", "/orders?status=created&limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let (status, orders) = send(&app, "GET", "/orders?status=paid", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(orders.as_array().unwrap().is_empty());

    let (status, _) = send(&app, "GET", "/orders?status=shipped", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup().await;
    create_order(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_created_total"));
}
