//! HTTP surface: the `distributeOrder` RPC and the four trigger
//! webhook entrypoints, wrapped in the same `ApiResponse<T>` envelope the
//! wider codebase's handlers use.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::{AppConfig, DistributionMode};
use crate::errors::EngineError;
use crate::metrics;
use crate::model::{CanonicalLineItem, Purchase, PurchaseItemDoc, ServingPoint};
use crate::orchestrator;
use crate::quantity;
use crate::reconciler;
use crate::refund;
use crate::scheduler::{self, DistributedPurchaseSummary, DistributionRequest};
use crate::store::DocumentStore;
use crate::triggers::{
    NotificationUpdatePayload, OrderCreatePayload, PosItemUpdatePayload, PurchaseWritePayload,
};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self { success: false, data: None, error: Some(message) }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/v1/distribute-order", post(distribute_order))
        .route("/v1/triggers/purchase-write", post(purchase_write))
        .route("/v1/triggers/pos-item-update", post(pos_item_update))
        .route("/v1/triggers/notification-update", post(notification_update))
        .route("/v1/triggers/order-create", post(order_create))
        .route("/metrics/json", get(metrics_json))
        .with_state(state)
}

fn error_response(err: EngineError) -> axum::response::Response {
    let (status, message) = match &err {
        EngineError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        EngineError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        EngineError::Unsupported(msg) => (StatusCode::NOT_IMPLEMENTED, msg.clone()),
        EngineError::Transient(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        EngineError::Permanent(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
    };
    error!(error = %err, "request failed");
    (status, Json(ApiResponse::<()>::err(message))).into_response()
}

// ---- distributeOrder RPC -----------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeOrderItem {
    pub item_id: String,
    #[serde(default)]
    pub selected_extras: Vec<String>,
    #[serde(default)]
    pub excluded_ingredients: Vec<String>,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
}

fn default_quantity() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeOrderRequest {
    pub event_id: String,
    pub items: Vec<DistributeOrderItem>,
    pub serving_point: ServingPoint,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub distribution_mode: Option<DistributionMode>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeOrderResponse {
    pub success: bool,
    pub purchase_id: String,
    pub distributed_purchases: Vec<DistributedPurchaseSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `distributeOrder(eventId, items[], servingPoint, userId?, distributionMode?,
/// note?)`: creates the main purchase with a freshly generated id
/// and invokes the scheduler synchronously, bypassing the paid-edge guard
/// `onPurchaseWrite` applies to store-originated writes.
async fn distribute_order(
    State(state): State<ApiState>,
    Json(req): Json<DistributeOrderRequest>,
) -> impl IntoResponse {
    info!(event_id = %req.event_id, "distributeOrder RPC received");

    if req.event_id.is_empty() || req.items.is_empty() || req.serving_point.id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(DistributeOrderResponse {
                success: false,
                purchase_id: String::new(),
                distributed_purchases: vec![],
                error: Some("Missing required fields".to_string()),
            }),
        )
            .into_response();
    }

    let tenant = match state.store.get_event(&req.event_id).await {
        Ok(t) => t,
        Err(err) => return error_response(err.into()),
    };
    let mode = req.distribution_mode.unwrap_or(tenant.distribution_mode);

    let purchase_id = Uuid::new_v4().to_string();
    let purchase = Purchase {
        id: purchase_id.clone(),
        serving_point_id: req.serving_point.id.clone(),
        user_id: req.user_id.clone(),
        note: req.note.clone(),
        order_placed: chrono::Utc::now(),
        is_paid: true,
        distributed: false,
        distributed_at: None,
        distribution_error: None,
        distribution_failed: false,
        total_price: None,
    };
    if let Err(err) = state.store.create_purchase(&req.event_id, purchase).await {
        return error_response(err.into());
    }

    let mut line_items = Vec::new();
    for requested in &req.items {
        let doc = PurchaseItemDoc {
            item_id: requested.item_id.clone(),
            quantity: Some(requested.quantity),
            count: None,
            selected_extras: Some(requested.selected_extras.clone()),
            excluded_ingredients: Some(requested.excluded_ingredients.clone()),
            entries: None,
            status: None,
            calculated: false,
        };
        if let Err(err) = state
            .store
            .create_purchase_item(&req.event_id, &purchase_id, doc.clone())
            .await
        {
            return error_response(err.into());
        }

        for line in quantity::normalize(&doc) {
            let item = match state.store.get_canonical_item(&req.event_id, &line.item_id).await {
                Ok(catalog) => CanonicalLineItem {
                    item_id: line.item_id,
                    selected_extras: line.selected_extras,
                    excluded_ingredients: line.excluded_ingredients,
                    name: catalog.name,
                    price: catalog.price,
                    category: catalog.category,
                    category_name: catalog.category_name,
                },
                Err(_) => CanonicalLineItem {
                    item_id: line.item_id,
                    selected_extras: line.selected_extras,
                    excluded_ingredients: line.excluded_ingredients,
                    name: doc.name.clone(),
                    price: doc.price.unwrap_or_default(),
                    category: doc.category.clone(),
                    category_name: doc.category_name.clone(),
                },
            };
            line_items.push(item);
        }
    }

    let result = scheduler::distribute(
        state.store.as_ref(),
        DistributionRequest {
            event_id: req.event_id.clone(),
            purchase_id: purchase_id.clone(),
            items: line_items,
            serving_point: req.serving_point,
            mode,
            note: req.note.clone(),
            open_order_status: state.config.open_order_status.clone(),
        },
    )
    .await;

    match result {
        Ok(outcome) => {
            if let Err(err) = state
                .store
                .mark_purchase_distributed_if_not_already(&req.event_id, &purchase_id)
                .await
            {
                return error_response(err.into());
            }
            metrics::ORDERS_DISTRIBUTED_TOTAL.inc();
            Json(DistributeOrderResponse {
                success: true,
                purchase_id,
                distributed_purchases: outcome.distributed_purchases,
                error: None,
            })
            .into_response()
        }
        Err(err) => {
            let _ = state
                .store
                .mark_purchase_distribution_failed(&req.event_id, &purchase_id, &err.to_string())
                .await;
            metrics::DISTRIBUTION_FAILURES_TOTAL.inc();
            error_response(err)
        }
    }
}

// ---- trigger webhooks ---------------------------------------------------

async fn purchase_write(
    State(state): State<ApiState>,
    Json(payload): Json<PurchaseWritePayload>,
) -> impl IntoResponse {
    info!(event_id = %payload.event_id, purchase_id = %payload.purchase_id, "onPurchaseWrite received");
    match orchestrator::on_purchase_write(state.store.as_ref(), payload.into(), &state.config.open_order_status).await {
        Ok(_) => (StatusCode::OK, Json(ApiResponse::ok(()))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn pos_item_update(
    State(state): State<ApiState>,
    Json(payload): Json<PosItemUpdatePayload>,
) -> impl IntoResponse {
    info!(event_id = %payload.event_id, pos_id = %payload.pos_id, item_id = %payload.item_id, "onPosItemUpdate received");
    let event = payload.into_event(state.config.open_order_status.clone());
    match reconciler::on_pos_item_update(state.store.as_ref(), event).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok(()))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn notification_update(
    State(state): State<ApiState>,
    Json(payload): Json<NotificationUpdatePayload>,
) -> impl IntoResponse {
    info!(event_id = %payload.event_id, notification_id = %payload.notification_id, "onNotificationUpdate received");
    match refund::on_notification_update(state.store.as_ref(), payload.into()).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok(()))).into_response(),
        Err(err) => error_response(err),
    }
}

/// `onOrderCreate` — peripheral. The cash-payment notification side
/// channel it would otherwise drive is out of scope here; this just
/// acknowledges receipt.
async fn order_create(Json(payload): Json<OrderCreatePayload>) -> impl IntoResponse {
    info!(event_id = %payload.event_id, order_id = %payload.order_id, "onOrderCreate received");
    StatusCode::ACCEPTED
}

async fn metrics_json() -> Json<serde_json::Value> {
    Json(metrics::metrics_snapshot())
}
