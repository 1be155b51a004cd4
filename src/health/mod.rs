//! Liveness/readiness endpoints, following the shape of the wider
//! codebase's health module but trimmed to this engine's only shared
//! dependency: the document store.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::store::DocumentStore;

#[derive(Clone)]
pub struct HealthState {
    pub store: Arc<dyn DocumentStore>,
    pub started_at: u64,
}

impl HealthState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            started_at: SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0),
        }
    }
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .route("/health/live", get(live))
        .with_state(state)
}

async fn health(State(state): State<HealthState>) -> Json<Value> {
    let uptime = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().saturating_sub(state.started_at))
        .unwrap_or(0);
    Json(json!({ "status": "up", "version": env!("CARGO_PKG_VERSION"), "uptime_seconds": uptime }))
}

async fn live() -> StatusCode {
    StatusCode::OK
}

/// Readiness probes a cheap store read; a store that can't answer `GetEvent`
/// for a sentinel id is still "ready" as long as it surfaces `NotFound`
/// rather than hanging or erroring transiently.
async fn ready(State(state): State<HealthState>) -> StatusCode {
    match state.store.get_event("__readiness_probe__").await {
        Ok(_) => StatusCode::OK,
        Err(crate::errors::StoreError::NotFound(_)) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
