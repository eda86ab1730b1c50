//! Reconciler implementation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use optical_core::{
    CONDITION_READY, ConditionStatus, ObjectKey, OpticalDevice, REASON_INVALID_CONFIGURATION,
    REASON_RECONCILIATION_SUCCESS, REASON_TRANSIENT_ERROR,
};
use optical_gateway::wire::STATUS_CONFIGURED;
use optical_gateway::{
    ConfigureRequest, ConfigureResponse, DeviceId, FailureClass, GatewayError, HardwareGateway,
    call_with_deadline,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ResourceClient;
use crate::config::ReconcilerConfig;
use crate::error::{Error, Result};
use crate::metrics::ReconcilerMetrics;
use crate::types::{Action, DECONFIGURE_FINALIZER};

const MESSAGE_CONFIGURED: &str = "Successfully configured hardware";

/// Why a cycle failed, before it is turned into a condition and an error.
enum Failure {
    Transient(String),
    Permanent(String),
    Internal(String),
}

impl Failure {
    fn from_gateway(err: &GatewayError) -> Self {
        match err.class() {
            FailureClass::Transient => Self::Transient(err.to_string()),
            FailureClass::Permanent => Self::Permanent(err.to_string()),
            FailureClass::NotFound | FailureClass::Internal => Self::Internal(err.to_string()),
        }
    }
}

/// K8s-style reconciler for optical devices.
///
/// Stateless between invocations: everything it needs to resume (retry
/// attempt, generation last acted on) lives in the resource status.
pub struct Reconciler {
    /// Resource API.
    client: Arc<dyn ResourceClient>,
    /// Hardware access.
    gateway: Arc<dyn HardwareGateway>,
    /// Side-effect metrics.
    metrics: Arc<ReconcilerMetrics>,
    /// Configuration.
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(
        client: Arc<dyn ResourceClient>,
        gateway: Arc<dyn HardwareGateway>,
        metrics: Arc<ReconcilerMetrics>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            client,
            gateway,
            metrics,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    #[must_use]
    pub const fn metrics(&self) -> &Arc<ReconcilerMetrics> {
        &self.metrics
    }

    /// Drive the resource at `key` toward its desired configuration.
    ///
    /// Returns the follow-up [`Action`] on success. A lost status-write race
    /// re-runs the whole cycle once; a second loss is reported as transient.
    ///
    /// # Errors
    ///
    /// - `Error::Transient` / `Error::Internal`: retry after `retry_after`
    /// - `Error::Permanent`: the current generation is rejected
    /// - `Error::Cancelled`: `cancel` fired; no status was written
    pub async fn reconcile(&self, key: &ObjectKey, cancel: &CancellationToken) -> Result<Action> {
        let result = match self.reconcile_cycle(key, cancel).await {
            Err(Error::Conflict { .. }) => {
                debug!(key = %key, "Status write conflict, retrying cycle");
                match self.reconcile_cycle(key, cancel).await {
                    Err(Error::Conflict {
                        expected, actual, ..
                    }) => Err(Error::transient(
                        format!(
                            "status write conflict (expected version {expected}, found {actual})"
                        ),
                        self.config.backoff().base(),
                    )),
                    other => other,
                }
            }
            other => other,
        };

        // Losing the object mid-cycle is a deletion, not a failure.
        let result = match result {
            Err(Error::NotFound { key: gone }) => {
                debug!(key = %gone, "Resource removed during reconciliation");
                Ok(Action::AwaitChange)
            }
            other => other,
        };

        match &result {
            Ok(action) => debug!(key = %key, action = %action, "Reconciled"),
            Err(Error::Cancelled { .. }) => {
                self.metrics.record_error("cancelled");
                debug!(key = %key, "Reconciliation cancelled");
            }
            Err(e) => {
                self.metrics.record_error(e.kind());
                warn!(key = %key, error = %e, "Reconciliation failed");
            }
        }

        result
    }

    async fn reconcile_cycle(&self, key: &ObjectKey, cancel: &CancellationToken) -> Result<Action> {
        let Some(mut device) = self.client.get(key).await? else {
            debug!(key = %key, "Resource no longer exists");
            return Ok(Action::AwaitChange);
        };

        if device.is_being_deleted() {
            return self.finalize(&device, cancel).await;
        }

        if device.is_rejected_for_current_generation() {
            debug!(
                key = %key,
                generation = device.metadata.generation,
                "Configuration rejected for this generation, waiting for a change"
            );
            return Ok(Action::AwaitChange);
        }

        if !device.metadata.has_finalizer(DECONFIGURE_FINALIZER) {
            device = self.client.add_finalizer(key, DECONFIGURE_FINALIZER).await?;
        }

        // The hostname moved: take the old device down before configuring
        // the new one.
        if let Some(previous) = device
            .status
            .observed_identifier
            .clone()
            .filter(|observed| observed.as_str() != device.device_id())
        {
            info!(
                key = %key,
                previous = %previous,
                current = device.device_id(),
                "Device identifier changed"
            );
            if let Err(err) = self.release(&device, &previous, cancel).await {
                return self.release_failed(&device, err).await;
            }
        }

        let request = configure_request(&device);
        debug!(
            key = %key,
            identifier = %request.identifier,
            bandwidth = %request.bandwidth,
            laser_power = %request.laser_power,
            "Configuring device"
        );

        let outcome = call_with_deadline(
            self.gateway.configure(&request),
            self.config.gateway_timeout(),
            cancel,
        )
        .await;

        match outcome {
            Ok(readback) if readback.status == STATUS_CONFIGURED => {
                self.record_success(&device, readback).await
            }
            Ok(readback) => {
                let reason = format!("unexpected configure status '{}'", readback.status);
                self.record_failure(&device, Failure::Internal(reason)).await
            }
            Err(GatewayError::Cancelled) => Err(Error::Cancelled {
                retry_after: self.retry_delay(&device),
            }),
            Err(err) => {
                self.record_failure(&device, Failure::from_gateway(&err))
                    .await
            }
        }
    }

    /// Persist a successful readback in one status write.
    async fn record_success(
        &self,
        device: &OpticalDevice,
        readback: ConfigureResponse,
    ) -> Result<Action> {
        let identifier = device.device_id();
        let previous_series = device.status.observed_bandwidth.clone().map(|bandwidth| {
            let observed = device
                .status
                .observed_identifier
                .clone()
                .unwrap_or_else(|| identifier.to_string());
            (observed, bandwidth)
        });
        let observed_laser_power = readback
            .observed_laser_power
            .unwrap_or_else(|| device.spec.parameters.laser_power.clone());

        let mut status = device.status.clone();
        status.observed_bandwidth = Some(readback.observed_bandwidth.clone());
        status.observed_laser_power = Some(observed_laser_power);
        status.observed_identifier = Some(identifier.to_string());
        status.last_sync_time = Some(readback.last_updated);
        status.observed_generation = Some(device.metadata.generation);
        status.consecutive_failures = 0;
        status.conditions.upsert(
            CONDITION_READY,
            ConditionStatus::True,
            REASON_RECONCILIATION_SUCCESS,
            MESSAGE_CONFIGURED,
            Utc::now(),
        );

        self.client
            .update_status(&device.key(), device.metadata.resource_version, status)
            .await?;

        if let Some((observed, bandwidth)) = previous_series.filter(|(observed, bandwidth)| {
            observed.as_str() != identifier || *bandwidth != readback.observed_bandwidth
        }) {
            self.metrics.forget_configured(&observed, &bandwidth);
        }
        self.metrics
            .record_configured(identifier, &readback.observed_bandwidth);
        self.metrics.record_success();

        info!(
            key = %device.key(),
            identifier,
            bandwidth = %readback.observed_bandwidth,
            "Device configured"
        );
        Ok(Action::Requeue(self.config.resync_interval()))
    }

    /// Persist a failed cycle as a Ready=False condition.
    async fn record_failure(&self, device: &OpticalDevice, failure: Failure) -> Result<Action> {
        let now = Utc::now();
        let mut status = device.status.clone();
        status.observed_generation = Some(device.metadata.generation);

        let error = match failure {
            Failure::Permanent(reason) => {
                status.conditions.upsert(
                    CONDITION_READY,
                    ConditionStatus::False,
                    REASON_INVALID_CONFIGURATION,
                    reason.clone(),
                    now,
                );
                Error::permanent(reason)
            }
            Failure::Transient(reason) => {
                let retry_after = self.retry_delay(device);
                status.consecutive_failures = status.consecutive_failures.saturating_add(1);
                status.conditions.upsert(
                    CONDITION_READY,
                    ConditionStatus::False,
                    REASON_TRANSIENT_ERROR,
                    reason.clone(),
                    now,
                );
                Error::transient(reason, retry_after)
            }
            Failure::Internal(reason) => {
                let retry_after = self.retry_delay(device);
                status.consecutive_failures = status.consecutive_failures.saturating_add(1);
                status.conditions.upsert(
                    CONDITION_READY,
                    ConditionStatus::False,
                    REASON_TRANSIENT_ERROR,
                    format!("gateway contract violation: {reason}"),
                    now,
                );
                Error::internal(reason, retry_after)
            }
        };

        self.client
            .update_status(&device.key(), device.metadata.resource_version, status)
            .await?;
        Err(error)
    }

    /// Deconfigure the device of a deleting resource and release it.
    ///
    /// Both the current identifier and the one last configured are taken
    /// down, so an unfinished hostname move leaves nothing behind.
    async fn finalize(&self, device: &OpticalDevice, cancel: &CancellationToken) -> Result<Action> {
        let key = device.key();
        if !device.metadata.has_finalizer(DECONFIGURE_FINALIZER) {
            return Ok(Action::AwaitChange);
        }

        let mut identifiers = vec![device.device_id().to_string()];
        if let Some(observed) = device
            .status
            .observed_identifier
            .as_ref()
            .filter(|observed| observed.as_str() != device.device_id())
        {
            identifiers.push(observed.clone());
        }

        for identifier in &identifiers {
            if let Err(err) = self.release(device, identifier, cancel).await {
                return self.release_failed(device, err).await;
            }
        }

        self.client
            .remove_finalizer(&key, DECONFIGURE_FINALIZER)
            .await?;
        Ok(Action::AwaitChange)
    }

    /// Deconfigure `identifier` and drop its metric series. A device the
    /// gateway no longer knows counts as released.
    async fn release(
        &self,
        device: &OpticalDevice,
        identifier: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), GatewayError> {
        let key = device.key();
        let identifier = DeviceId::new(identifier);
        let outcome = call_with_deadline(
            self.gateway.deconfigure(&identifier),
            self.config.gateway_timeout(),
            cancel,
        )
        .await;

        match outcome {
            Ok(_) => info!(key = %key, identifier = %identifier, "Device deconfigured"),
            Err(GatewayError::NotFound { .. }) => {
                debug!(key = %key, identifier = %identifier, "Device already deconfigured");
            }
            Err(err) => return Err(err),
        }

        if let Some(bandwidth) = &device.status.observed_bandwidth {
            self.metrics
                .forget_configured(identifier.as_str(), bandwidth);
        }
        Ok(())
    }

    async fn release_failed(&self, device: &OpticalDevice, err: GatewayError) -> Result<Action> {
        match err {
            GatewayError::Cancelled => Err(Error::Cancelled {
                retry_after: self.retry_delay(device),
            }),
            err => {
                let reason = format!("deconfigure failed: {err}");
                self.record_failure(device, Failure::Transient(reason)).await
            }
        }
    }

    fn retry_delay(&self, device: &OpticalDevice) -> Duration {
        self.config
            .backoff()
            .delay_for(device.status.consecutive_failures)
    }
}

/// Build the gateway request for a device without touching its spec.
#[must_use]
pub fn configure_request(device: &OpticalDevice) -> ConfigureRequest {
    ConfigureRequest {
        identifier: DeviceId::new(device.device_id()),
        port: device.spec.controller_config.port,
        bandwidth: device.spec.parameters.bandwidth.clone(),
        laser_power: device.spec.parameters.laser_power.clone(),
        channel: device.spec.parameters.channel,
    }
}
