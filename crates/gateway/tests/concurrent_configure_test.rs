//! Concurrent configure calls against the simulated gateway.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use optical_gateway::{
    ConfigureRequest, DeviceId, DeviceRecordStore, FaultModel, HardwareGateway, SimulatedGateway,
};
use tokio::task::JoinSet;

const DEVICES: usize = 32;
const ROUNDS: usize = 8;

fn request(index: usize, round: usize) -> ConfigureRequest {
    ConfigureRequest {
        identifier: DeviceId::new(format!("laser-{index}.site1")),
        port: 830,
        bandwidth: format!("{}Gbps", (round + 1) * 100),
        laser_power: format!("{index}dBm"),
        channel: None,
    }
}

/// Given N devices configured concurrently, each several times in order
/// When every call has completed
/// Then each record holds its own device's last configuration
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_configure_keeps_devices_isolated() {
    let gateway = Arc::new(SimulatedGateway::with_faults(
        Arc::new(DeviceRecordStore::new()),
        FaultModel::new().with_latency(Duration::from_millis(1)),
    ));

    let mut tasks = JoinSet::new();
    for index in 0..DEVICES {
        let gateway = Arc::clone(&gateway);
        tasks.spawn(async move {
            for round in 0..ROUNDS {
                let readback = gateway.configure(&request(index, round)).await.unwrap();
                assert_eq!(readback.observed_bandwidth, format!("{}Gbps", (round + 1) * 100));
            }
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.expect("configure task panicked");
    }

    assert_eq!(gateway.store().len(), DEVICES);
    assert_eq!(gateway.configure_calls(), (DEVICES * ROUNDS) as u64);
    for index in 0..DEVICES {
        let record = gateway
            .store()
            .get(&DeviceId::new(format!("laser-{index}.site1")))
            .unwrap();
        assert_eq!(record.bandwidth, format!("{}Gbps", ROUNDS * 100));
        assert_eq!(record.laser_power, format!("{index}dBm"));
    }
}
