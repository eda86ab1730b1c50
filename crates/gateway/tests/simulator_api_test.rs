//! Simulator REST API integration tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use optical_gateway::server::routes;
use optical_gateway::{DeviceRecordStore, Fault, SimulatedGateway};
use serde_json::{Value, json};

fn create_test_server() -> (TestServer, Arc<SimulatedGateway>) {
    let gateway = Arc::new(SimulatedGateway::new(Arc::new(DeviceRecordStore::new())));
    let app = routes::create_router().with_state(Arc::clone(&gateway));
    (
        TestServer::new(app).expect("Failed to create test server"),
        gateway,
    )
}

#[tokio::test]
async fn test_health_check_returns_ok() {
    let (server, _) = create_test_server();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["devices"], 0);
}

#[tokio::test]
async fn test_configure_returns_readback() {
    let (server, _) = create_test_server();

    let response = server
        .post("/configure")
        .json(&json!({
            "hostname": "laser-a1.site1",
            "port": 830,
            "bandwidth": "100Gbps",
            "laserPower": "15dBm"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "configured");
    assert_eq!(body["observedBandwidth"], "100Gbps");
    assert_eq!(body["observedLaserPower"], "15dBm");
    assert!(body["lastUpdated"].is_string());
}

#[tokio::test]
async fn test_configured_device_is_listed() {
    let (server, _) = create_test_server();
    server
        .post("/configure")
        .json(&json!({
            "identifier": "laser-b2",
            "port": 830,
            "bandwidth": "400Gbps",
            "laserPower": "-2.5dBm",
            "channel": 12
        }))
        .await;

    let list: Value = server.get("/devices").await.json();
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let response = server.get("/devices/laser-b2").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let device: Value = response.json();
    assert_eq!(device["bandwidth"], "400Gbps");
    assert_eq!(device["channel"], 12);
}

#[tokio::test]
async fn test_unknown_device_returns_404() {
    let (server, _) = create_test_server();

    let response = server.get("/devices/nope").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_invalid_bandwidth_returns_400() {
    let (server, gateway) = create_test_server();

    let response = server
        .post("/configure")
        .json(&json!({
            "identifier": "laser-a1",
            "port": 830,
            "bandwidth": "very fast",
            "laserPower": "15dBm"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(gateway.store().is_empty());
}

#[tokio::test]
async fn test_malformed_json_returns_400() {
    let (server, _) = create_test_server();

    let response = server
        .post("/configure")
        .bytes("{not json".into())
        .content_type("application/json")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["title"], "Bad Request");
}

#[tokio::test]
async fn test_deconfigure_then_404() {
    let (server, _) = create_test_server();
    server
        .post("/configure")
        .json(&json!({
            "identifier": "laser-a1",
            "port": 830,
            "bandwidth": "100Gbps",
            "laserPower": "15dBm"
        }))
        .await;

    let first = server
        .delete("/deconfigure")
        .json(&json!({ "hostname": "laser-a1" }))
        .await;
    assert_eq!(first.status_code(), StatusCode::OK);
    let body: Value = first.json();
    assert_eq!(body["status"], "deconfigured");
    assert_eq!(body["identifier"], "laser-a1");

    let second = server
        .delete("/deconfigure")
        .json(&json!({ "hostname": "laser-a1" }))
        .await;
    assert_eq!(second.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_injected_outage_returns_503() {
    let (server, gateway) = create_test_server();
    gateway.faults().push(Fault::Unavailable);

    let response = server
        .post("/configure")
        .json(&json!({
            "identifier": "laser-a1",
            "port": 830,
            "bandwidth": "100Gbps",
            "laserPower": "15dBm"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}
