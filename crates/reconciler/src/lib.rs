//! K8s-style reconciliation for optical devices.
//!
//! This crate drives each `OpticalDevice` resource toward its desired
//! configuration:
//!
//! - **Desired State**: the resource spec (bandwidth, laser power, channel)
//! - **Actual State**: what the hardware gateway reads back
//! - **Reconcile**: configure the device, record the readback and a `Ready`
//!   condition in one status write, decide when to look again
//!
//! # Key Concepts
//!
//! ## Reconciliation
//!
//! [`Reconciler::reconcile`] handles one key and is level triggered: calling
//! it again with nothing changed is safe. Failures are classified:
//!
//! - transient (timeout, connection, 5xx): `Ready=False/TransientError`,
//!   retried with exponential backoff
//! - permanent (rejected configuration): `Ready=False/InvalidConfiguration`,
//!   not retried until the spec changes
//! - cancelled: nothing written, rescheduled
//!
//! ## Loop
//!
//! [`ReconciliationLoop`] runs a pool of workers over a de-duplicating
//! [`WorkQueue`] fed by the resource watch. A key is never reconciled by two
//! workers at once.
//!
//! # Example
//!
//! ```ignore
//! use optical_gateway::{DeviceRecordStore, SimulatedGateway};
//! use optical_reconciler::{
//!     InMemoryResourceClient, Reconciler, ReconcilerConfig, ReconcilerMetrics,
//!     ReconciliationLoop,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Arc::new(InMemoryResourceClient::new());
//!     let gateway = Arc::new(SimulatedGateway::new(Arc::new(DeviceRecordStore::new())));
//!     let metrics = Arc::new(ReconcilerMetrics::new().unwrap());
//!     let reconciler = Arc::new(Reconciler::new(
//!         client.clone(),
//!         gateway,
//!         metrics,
//!         ReconcilerConfig::default(),
//!     ));
//!
//!     let reconciliation = ReconciliationLoop::new(reconciler, client);
//!     let stopper = reconciliation.stopper();
//!
//!     // Run until stopped
//!     // reconciliation.run().await;
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod r#loop;
pub mod metrics;
pub mod queue;
pub mod reconciler;
pub mod types;

pub use backoff::BackoffPolicy;
pub use client::{InMemoryResourceClient, ResourceClient};
pub use config::ReconcilerConfig;
pub use error::{Error, Result};
pub use r#loop::{LoopStopper, ReconciliationLoop};
pub use metrics::ReconcilerMetrics;
pub use queue::WorkQueue;
pub use reconciler::{Reconciler, configure_request};
pub use types::{Action, DECONFIGURE_FINALIZER};
