//! HttpGateway against a live simulator on an ephemeral port.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use optical_gateway::{
    ConfigureRequest, DeviceId, DeviceRecordStore, Fault, FaultModel, GatewayError,
    HardwareGateway, HttpGateway, SimulatedGateway, server,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use url::Url;

struct Harness {
    simulator: Arc<SimulatedGateway>,
    client: HttpGateway,
    shutdown: CancellationToken,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn start(faults: FaultModel, timeout: Duration) -> Harness {
    let simulator = Arc::new(SimulatedGateway::with_faults(
        Arc::new(DeviceRecordStore::new()),
        faults,
    ));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();

    tokio::spawn(server::serve(listener, Arc::clone(&simulator), shutdown.clone()));

    let client = HttpGateway::new(Url::parse(&format!("http://{addr}")).unwrap(), timeout)
        .expect("client");
    Harness {
        simulator,
        client,
        shutdown,
    }
}

fn request(id: &str) -> ConfigureRequest {
    ConfigureRequest {
        identifier: DeviceId::new(id),
        port: 830,
        bandwidth: "100Gbps".to_string(),
        laser_power: "15dBm".to_string(),
        channel: None,
    }
}

#[tokio::test]
async fn test_configure_over_http() {
    let h = start(FaultModel::new(), Duration::from_secs(5)).await;

    let readback = h.client.configure(&request("laser-a1")).await.unwrap();

    assert_eq!(readback.observed_bandwidth, "100Gbps");
    assert_eq!(readback.observed_laser_power.as_deref(), Some("15dBm"));
    assert!(h.simulator.store().get(&DeviceId::new("laser-a1")).is_ok());
}

#[tokio::test]
async fn test_rejection_maps_to_rejected() {
    let h = start(FaultModel::new(), Duration::from_secs(5)).await;
    let mut bad = request("laser-a1");
    bad.laser_power = "bright".to_string();

    let err = h.client.configure(&bad).await.unwrap_err();

    assert!(matches!(err, GatewayError::Rejected { .. }), "{err:?}");
    assert!(err.to_string().contains("laserPower"));
}

#[tokio::test]
async fn test_deconfigure_unknown_maps_to_not_found() {
    let h = start(FaultModel::new(), Duration::from_secs(5)).await;

    let err = h.client.deconfigure(&DeviceId::new("ghost")).await.unwrap_err();

    assert_eq!(err, GatewayError::not_found("ghost"));
}

#[tokio::test]
async fn test_deconfigure_over_http() {
    let h = start(FaultModel::new(), Duration::from_secs(5)).await;
    h.client.configure(&request("laser-a1")).await.unwrap();

    let ack = h.client.deconfigure(&DeviceId::new("laser-a1")).await.unwrap();

    assert_eq!(ack.identifier, DeviceId::new("laser-a1"));
    assert!(h.simulator.store().is_empty());
}

#[tokio::test]
async fn test_server_fault_maps_to_transient() {
    let h = start(FaultModel::new(), Duration::from_secs(5)).await;
    h.simulator.faults().push(Fault::ServerError);

    let err = h.client.configure(&request("laser-a1")).await.unwrap_err();

    assert!(matches!(err, GatewayError::Server { status: 503, .. }), "{err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_slow_gateway_times_out() {
    let h = start(
        FaultModel::new().with_latency(Duration::from_secs(3)),
        Duration::from_millis(200),
    )
    .await;

    let err = h.client.configure(&request("laser-a1")).await.unwrap_err();

    assert_eq!(err, GatewayError::Timeout { timeout_ms: 200 });
}

#[tokio::test]
async fn test_refused_connection_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpGateway::new(
        Url::parse(&format!("http://{addr}")).unwrap(),
        Duration::from_secs(2),
    )
    .unwrap();
    let err = client.configure(&request("laser-a1")).await.unwrap_err();

    assert!(matches!(err, GatewayError::Unavailable { .. }), "{err:?}");
}
