//! Hardware gateway for optical devices.
//!
//! Defines the [`HardwareGateway`] contract the reconciler drives, two
//! implementations of it ([`SimulatedGateway`] in-process, [`HttpGateway`]
//! over the JSON wire contract) and the simulator HTTP server that exposes a
//! [`SimulatedGateway`] on the network.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod gateway;
pub mod http;
pub mod server;
pub mod simulated;
pub mod store;
pub mod validation;
pub mod wire;

pub use error::{FailureClass, GatewayError, Result, StoreError};
pub use gateway::{HardwareGateway, call_with_deadline};
pub use http::HttpGateway;
pub use simulated::{Fault, FaultModel, SimulatedGateway};
pub use store::{DeviceRecord, DeviceRecordStore};
pub use wire::{
    ConfigureRequest, ConfigureResponse, DeconfigureRequest, DeconfigureResponse, DeviceId,
};
