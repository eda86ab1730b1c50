//! The hardware gateway contract.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{GatewayError, Result};
use crate::wire::{ConfigureRequest, ConfigureResponse, DeconfigureResponse, DeviceId};

/// Request/response boundary toward the device hardware.
///
/// Implementations never retry on their own; timeouts and retries are the
/// caller's responsibility (see [`call_with_deadline`]).
#[async_trait]
pub trait HardwareGateway: Send + Sync {
    /// Apply a configuration. Repeating the same request is an idempotent
    /// upsert; the response carries the values the gateway now considers
    /// authoritative.
    async fn configure(&self, request: &ConfigureRequest) -> Result<ConfigureResponse>;

    /// Remove a device's configuration. Succeeds once, then `NotFound`.
    async fn deconfigure(&self, identifier: &DeviceId) -> Result<DeconfigureResponse>;
}

/// Run a gateway call bounded by `timeout` and abortable through `cancel`.
///
/// Cancellation wins over completion when both are ready.
///
/// # Errors
///
/// Returns `GatewayError::Cancelled` if `cancel` fires first,
/// `GatewayError::Timeout` if the call does not finish in time, or the
/// call's own error.
pub async fn call_with_deadline<T, F>(
    call: F,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(GatewayError::Cancelled),
        outcome = tokio::time::timeout(timeout, call) => {
            outcome.unwrap_or_else(|_| Err(GatewayError::timeout(timeout)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_passes_through_result() {
        let cancel = CancellationToken::new();
        let result = call_with_deadline(async { Ok(7) }, Duration::from_secs(1), &cancel).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_times_out() {
        let cancel = CancellationToken::new();
        let result: Result<()> = call_with_deadline(
            std::future::pending(),
            Duration::from_millis(250),
            &cancel,
        )
        .await;
        assert_eq!(result, Err(GatewayError::Timeout { timeout_ms: 250 }));
    }

    #[tokio::test]
    async fn test_deadline_observes_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<()> =
            call_with_deadline(std::future::pending(), Duration::from_secs(60), &cancel).await;
        assert_eq!(result, Err(GatewayError::Cancelled));
    }
}
