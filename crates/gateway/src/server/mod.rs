//! Hardware simulator HTTP server.

mod error;
pub mod routes;

pub use error::{AppError, ErrorResponse};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::simulated::SimulatedGateway;

/// Simulator application with tracing middleware.
pub fn create_app(gateway: Arc<SimulatedGateway>) -> Router {
    routes::create_router()
        .with_state(gateway)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve the simulator until `shutdown` fires.
///
/// # Errors
///
/// Returns an I/O error if binding or serving fails.
pub async fn run_server(
    addr: SocketAddr,
    gateway: Arc<SimulatedGateway>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, gateway, shutdown).await
}

/// Serve the simulator on an already bound listener until `shutdown` fires.
///
/// # Errors
///
/// Returns an I/O error if serving fails.
pub async fn serve(
    listener: TcpListener,
    gateway: Arc<SimulatedGateway>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    info!("Hardware simulator listening on {}", listener.local_addr()?);

    axum::serve(listener, create_app(gateway))
        .with_graceful_shutdown(async move { shutdown.cancelled_owned().await })
        .await
}
