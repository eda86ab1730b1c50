//! HTTP client for a remote hardware gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::{GatewayError, Result};
use crate::gateway::HardwareGateway;
use crate::server::ErrorResponse;
use crate::wire::{
    ConfigureRequest, ConfigureResponse, DeconfigureRequest, DeconfigureResponse, DeviceId,
    STATUS_CONFIGURED, STATUS_DECONFIGURED,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Gateway that speaks the JSON wire contract over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
    timeout: Duration,
}

impl HttpGateway {
    /// Create a client for the gateway at `base`, bounding each request by
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Unavailable` if the HTTP client cannot be built.
    pub fn new(mut base: Url, timeout: Duration) -> Result<Self> {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::unavailable(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base,
            timeout,
        })
    }

    /// Base URL of the gateway.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| GatewayError::unavailable(format!("invalid gateway url: {e}")))
    }

    fn transport_error(&self, err: &reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::timeout(self.timeout)
        } else if err.is_decode() {
            GatewayError::invalid_response(err.to_string())
        } else {
            GatewayError::unavailable(err.to_string())
        }
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response, identifier: &DeviceId) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| GatewayError::invalid_response(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorResponse>(&body)
            .map(|problem| problem.detail)
            .unwrap_or(body);
        warn!(identifier = %identifier, status = %status, detail = %detail, "Gateway returned error");

        Err(status_error(status, detail, identifier, self.timeout))
    }
}

/// Classify a non-success answer. Only client errors that blame the request
/// itself are permanent; throttling and write races are retried.
fn status_error(
    status: StatusCode,
    detail: String,
    identifier: &DeviceId,
    timeout: Duration,
) -> GatewayError {
    match status {
        StatusCode::NOT_FOUND => GatewayError::not_found(identifier.as_str()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GatewayError::timeout(timeout),
        StatusCode::CONFLICT | StatusCode::TOO_MANY_REQUESTS => {
            GatewayError::server(status.as_u16(), detail)
        }
        s if s.is_client_error() => GatewayError::rejected(detail),
        s => GatewayError::server(s.as_u16(), detail),
    }
}

#[async_trait]
impl HardwareGateway for HttpGateway {
    async fn configure(&self, request: &ConfigureRequest) -> Result<ConfigureResponse> {
        let url = self.endpoint("configure")?;
        debug!(identifier = %request.identifier, url = %url, "POST configure");

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let readback: ConfigureResponse = self.decode(response, &request.identifier).await?;
        if readback.status != STATUS_CONFIGURED {
            return Err(GatewayError::invalid_response(format!(
                "unexpected status '{}'",
                readback.status
            )));
        }
        if readback.observed_bandwidth.is_empty() {
            return Err(GatewayError::invalid_response("missing observedBandwidth"));
        }
        Ok(readback)
    }

    async fn deconfigure(&self, identifier: &DeviceId) -> Result<DeconfigureResponse> {
        let url = self.endpoint("deconfigure")?;
        debug!(identifier = %identifier, url = %url, "DELETE deconfigure");

        let body = DeconfigureRequest {
            identifier: identifier.clone(),
        };
        let response = self
            .client
            .delete(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let ack: DeconfigureResponse = self.decode(response, identifier).await?;
        if ack.status != STATUS_DECONFIGURED {
            return Err(GatewayError::invalid_response(format!(
                "unexpected status '{}'",
                ack.status
            )));
        }
        Ok(ack)
    }
}
