use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use order_distribution_engine::api::{self, ApiState};
use order_distribution_engine::config;
use order_distribution_engine::health::{self, HealthState};
use order_distribution_engine::store::memory::MemoryStore;
use order_distribution_engine::store::DocumentStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config()?;
    config::init_tracing(&config.log_level, config.log_json);

    info!("order distribution engine starting");

    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let config = Arc::new(config);

    let middleware = ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let app = Router::new()
        .merge(api::router(ApiState { store: store.clone(), config: config.clone() }))
        .merge(health::router(HealthState::new(store)))
        .layer(middleware);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("failed to bind {addr}: {e}");
        e
    })?;
    axum::serve(listener, app).await?;

    Ok(())
}
