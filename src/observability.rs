//! `/metrics` and `/health` endpoints of the controller.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use optical_reconciler::ReconcilerMetrics;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

pub fn create_router(metrics: Arc<ReconcilerMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .route("/health", get(health_check))
        .with_state(metrics)
        .layer(TraceLayer::new_for_http())
}

async fn render_metrics(State(metrics): State<Arc<ReconcilerMetrics>>) -> Response {
    match metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Serve the endpoints on `addr` until `shutdown` fires.
pub async fn serve(
    addr: SocketAddr,
    metrics: Arc<ReconcilerMetrics>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Metrics endpoint listening on {}", addr);

    axum::serve(listener, create_router(metrics))
        .with_graceful_shutdown(async move { shutdown.cancelled_owned().await })
        .await
}
