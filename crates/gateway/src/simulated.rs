//! In-process hardware gateway backed by a [`DeviceRecordStore`].
//!
//! Used by the simulator server and as a test double. Latency and failures
//! come from an injectable [`FaultModel`] so that timeout and error paths can
//! be driven deterministically.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, Result};
use crate::gateway::HardwareGateway;
use crate::store::{DeviceRecord, DeviceRecordStore};
use crate::validation::validate_request;
use crate::wire::{ConfigureRequest, ConfigureResponse, DeconfigureResponse, DeviceId};

/// A failure the simulator can be told to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Never answer; the caller's deadline fires.
    Hang,
    /// Connection refused.
    Unavailable,
    /// 5xx-equivalent failure.
    ServerError,
    /// Reject the request as invalid.
    Reject(String),
    /// Answer with a readback that violates the wire contract.
    CorruptReadback,
}

/// Injectable latency and failure schedule.
#[derive(Debug, Default)]
pub struct FaultModel {
    latency: Duration,
    scripted: Mutex<VecDeque<Fault>>,
    persistent: Mutex<Option<Fault>>,
}

impl FaultModel {
    /// No latency, no faults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue a fault for the next call (FIFO, one call each).
    pub fn push(&self, fault: Fault) {
        self.scripted.lock().push_back(fault);
    }

    /// Apply `fault` to every call until cleared with `None`.
    pub fn set_persistent(&self, fault: Option<Fault>) {
        *self.persistent.lock() = fault;
    }

    /// Configured latency.
    #[must_use]
    pub const fn latency(&self) -> Duration {
        self.latency
    }

    /// Take the fault for the current call: scripted faults first.
    fn next_fault(&self) -> Option<Fault> {
        self.scripted
            .lock()
            .pop_front()
            .or_else(|| self.persistent.lock().clone())
    }
}

/// Gateway that stores configurations in memory.
#[derive(Debug)]
pub struct SimulatedGateway {
    store: Arc<DeviceRecordStore>,
    faults: FaultModel,
    configure_calls: AtomicU64,
    deconfigure_calls: AtomicU64,
}

impl SimulatedGateway {
    /// Create a simulator over `store` without faults.
    #[must_use]
    pub fn new(store: Arc<DeviceRecordStore>) -> Self {
        Self::with_faults(store, FaultModel::new())
    }

    /// Create a simulator over `store` with a fault model.
    #[must_use]
    pub const fn with_faults(store: Arc<DeviceRecordStore>, faults: FaultModel) -> Self {
        Self {
            store,
            faults,
            configure_calls: AtomicU64::new(0),
            deconfigure_calls: AtomicU64::new(0),
        }
    }

    /// The backing record store.
    #[must_use]
    pub const fn store(&self) -> &Arc<DeviceRecordStore> {
        &self.store
    }

    /// The fault model, for injecting failures.
    #[must_use]
    pub const fn faults(&self) -> &FaultModel {
        &self.faults
    }

    /// Number of configure calls received.
    #[must_use]
    pub fn configure_calls(&self) -> u64 {
        self.configure_calls.load(Ordering::Relaxed)
    }

    /// Number of deconfigure calls received.
    #[must_use]
    pub fn deconfigure_calls(&self) -> u64 {
        self.deconfigure_calls.load(Ordering::Relaxed)
    }

    async fn simulate_latency(&self) {
        if !self.faults.latency.is_zero() {
            tokio::time::sleep(self.faults.latency).await;
        }
    }
}

/// Map an error-producing fault to its error; `Hang` and `CorruptReadback`
/// are handled by the caller.
fn fault_error(fault: &Fault) -> Option<GatewayError> {
    match fault {
        Fault::Unavailable => Some(GatewayError::unavailable("connection refused")),
        Fault::ServerError => Some(GatewayError::server(503, "device controller busy")),
        Fault::Reject(reason) => Some(GatewayError::rejected(reason.clone())),
        Fault::Hang | Fault::CorruptReadback => None,
    }
}

#[async_trait]
impl HardwareGateway for SimulatedGateway {
    async fn configure(&self, request: &ConfigureRequest) -> Result<ConfigureResponse> {
        self.configure_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;

        if let Some(fault) = self.faults.next_fault() {
            warn!(identifier = %request.identifier, fault = ?fault, "Injecting configure fault");
            if let Some(err) = fault_error(&fault) {
                return Err(err);
            }
            match fault {
                Fault::Hang => return std::future::pending().await,
                Fault::CorruptReadback => {
                    return Ok(ConfigureResponse {
                        status: "unknown".to_string(),
                        observed_bandwidth: String::new(),
                        observed_laser_power: None,
                        last_updated: Utc::now(),
                    });
                }
                Fault::Unavailable | Fault::ServerError | Fault::Reject(_) => {}
            }
        }

        validate_request(request)?;

        let now = Utc::now();
        let record = DeviceRecord::from_request(request, now);
        let previous = self.store.set(request.identifier.clone(), record);
        info!(
            identifier = %request.identifier,
            port = request.port,
            bandwidth = %request.bandwidth,
            laser_power = %request.laser_power,
            overwrite = previous.is_some(),
            "Configured device"
        );

        Ok(ConfigureResponse::configured(
            request.bandwidth.clone(),
            request.laser_power.clone(),
            now,
        ))
    }

    async fn deconfigure(&self, identifier: &DeviceId) -> Result<DeconfigureResponse> {
        self.deconfigure_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;

        if let Some(fault) = self.faults.next_fault() {
            warn!(identifier = %identifier, fault = ?fault, "Injecting deconfigure fault");
            if let Some(err) = fault_error(&fault) {
                return Err(err);
            }
            match fault {
                Fault::Hang => return std::future::pending().await,
                Fault::CorruptReadback => {
                    return Err(GatewayError::invalid_response("garbled acknowledgement"));
                }
                Fault::Unavailable | Fault::ServerError | Fault::Reject(_) => {}
            }
        }

        match self.store.delete(identifier) {
            Ok(_) => {
                info!(identifier = %identifier, "Deconfigured device");
                Ok(DeconfigureResponse::deconfigured(identifier.clone()))
            }
            Err(err) => {
                debug!(identifier = %identifier, "Deconfigure for unknown device");
                Err(err.into())
            }
        }
    }
}
