//! End-to-end coverage of the HTTP surface: the `distributeOrder`
//! RPC and the `onPosItemUpdate` trigger webhook, driven through the real
//! `axum::Router` with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
};
use order_distribution_engine::api::{self, ApiState};
use order_distribution_engine::config::{AppConfig, DistributionMode};
use order_distribution_engine::model::{CanonicalItem, PointOfSale, PosItem};
use order_distribution_engine::store::memory::MemoryStore;
use order_distribution_engine::store::DocumentStore;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn seeded_app() -> (axum::Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.seed_event("e1", DistributionMode::Balanced).await;
    store
        .seed_serving_point(
            "e1",
            order_distribution_engine::model::ServingPoint {
                id: "sp1".into(),
                name: "Table 1".into(),
                location: "Main Tent".into(),
                area_name: None,
                capacity: None,
            },
        )
        .await;
    store
        .seed_canonical_item(
            "e1",
            CanonicalItem { id: "x".into(), name: Some("Burger".into()), price: dec!(5.00), category: None, category_name: None, is_available: true, sold_out: false },
        )
        .await;
    store.seed_pos("e1", PointOfSale { id: "A".into(), name: "A".into(), description: None, location: None }).await;
    store
        .seed_pos_item(
            "e1",
            "A",
            PosItem { id: "x".into(), name: Some("Burger".into()), price: dec!(5.00), count: None, category: None, category_name: None, is_available: Some(true), sold_out: false, selected_extras: vec![], excluded_ingredients: vec![] },
        )
        .await;

    let config = Arc::new(AppConfig::default());
    let state = ApiState { store: store.clone() as Arc<dyn DocumentStore>, config };
    (api::router(state), store)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

#[tokio::test]
async fn distribute_order_rpc_creates_and_routes_a_purchase() {
    let (app, store) = seeded_app().await;

    let payload = json!({
        "eventId": "e1",
        "items": [{"itemId": "x", "quantity": 2.0}],
        "servingPoint": {"id": "sp1", "name": "Table 1", "location": "Main Tent"},
    });

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/v1/distribute-order")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    let purchase_id = body["purchaseId"].as_str().unwrap().to_string();
    assert_eq!(body["distributedPurchases"][0]["posId"], json!("A"));
    assert_eq!(body["distributedPurchases"][0]["itemsCount"], json!(1));

    let purchase = store.get_purchase("e1", &purchase_id).await.unwrap();
    assert!(purchase.distributed);

    let items = store.list_distributed_order_items("e1", "A", &purchase_id).await.unwrap();
    let x_count: i64 = items.iter().filter(|(_, i)| i.item_id == "x").map(|(_, i)| i.count).sum();
    assert_eq!(x_count, 2);
}

#[tokio::test]
async fn distribute_order_rpc_rejects_missing_fields() {
    let (app, _store) = seeded_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/v1/distribute-order")
                .header("content-type", "application/json")
                .body(Body::from(json!({"eventId": "", "items": [], "servingPoint": {"id": "", "name": "", "location": ""}}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn pos_item_update_trigger_reconciles_availability() {
    let (app, store) = seeded_app().await;

    let payload = json!({
        "eventId": "e1",
        "posId": "A",
        "itemId": "x",
        "beforeIsAvailable": true,
        "afterIsAvailable": false,
    });

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/v1/triggers/pos-item-update")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let canonical = store.get_canonical_item("e1", "x").await.unwrap();
    assert!(!canonical.is_available);
}

#[tokio::test]
async fn metrics_json_exposes_named_counters() {
    let (app, _store) = seeded_app().await;

    let response = app
        .oneshot(Request::builder().method(Method::GET).uri("/metrics/json").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body.get("orders_distributed_total").is_some());
}
