//! Simulator REST routes
//!
//! - `POST /configure` - apply a configuration, returns the readback
//! - `DELETE /deconfigure` - remove a configuration
//! - `GET /devices` - list applied configurations
//! - `GET /devices/{id}` - one applied configuration
//! - `GET /health` - liveness and device count

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    response::Json,
    routing::{delete, get, post},
};
use serde::Serialize;

use super::error::Result;
use crate::gateway::HardwareGateway;
use crate::simulated::SimulatedGateway;
use crate::store::DeviceRecord;
use crate::wire::{
    ConfigureRequest, ConfigureResponse, DeconfigureRequest, DeconfigureResponse, DeviceId,
};

/// Shared state of the simulator routes.
pub type SimulatorState = Arc<SimulatedGateway>;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    devices: usize,
}

/// Build the simulator router; apply state with `.with_state(..)`.
pub fn create_router() -> Router<SimulatorState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/configure", post(configure))
        .route("/deconfigure", delete(deconfigure))
        .route("/devices", get(list_devices))
        .route("/devices/{id}", get(get_device))
}

async fn health_check(State(gateway): State<SimulatorState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        devices: gateway.store().len(),
    })
}

async fn configure(
    State(gateway): State<SimulatorState>,
    payload: std::result::Result<Json<ConfigureRequest>, JsonRejection>,
) -> Result<Json<ConfigureResponse>> {
    let Json(request) = payload?;
    let response = gateway.configure(&request).await?;
    Ok(Json(response))
}

async fn deconfigure(
    State(gateway): State<SimulatorState>,
    payload: std::result::Result<Json<DeconfigureRequest>, JsonRejection>,
) -> Result<Json<DeconfigureResponse>> {
    let Json(request) = payload?;
    let response = gateway.deconfigure(&request.identifier).await?;
    Ok(Json(response))
}

async fn list_devices(State(gateway): State<SimulatorState>) -> Json<Vec<DeviceRecord>> {
    Json(gateway.store().list())
}

async fn get_device(
    State(gateway): State<SimulatorState>,
    Path(id): Path<String>,
) -> Result<Json<DeviceRecord>> {
    let record = gateway
        .store()
        .get(&DeviceId::new(id))
        .map_err(crate::error::GatewayError::from)?;
    Ok(Json(record))
}
