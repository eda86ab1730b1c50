//! Request/response bodies of the gateway wire contract.
//!
//! - `POST /configure`: [`ConfigureRequest`] -> [`ConfigureResponse`]
//! - `DELETE /deconfigure`: [`DeconfigureRequest`] -> [`DeconfigureResponse`]
//!
//! `hostname` is accepted as an alias of `identifier` on input.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `status` value of a successful configure response.
pub const STATUS_CONFIGURED: &str = "configured";
/// `status` value of a successful deconfigure response.
pub const STATUS_DECONFIGURED: &str = "deconfigured";

/// Identifier of a device (hostname or IP address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Apply a configuration to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureRequest {
    #[serde(alias = "hostname")]
    pub identifier: DeviceId,
    pub port: u16,
    pub bandwidth: String,
    pub laser_power: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u32>,
}

/// Readback after a configure call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureResponse {
    pub status: String,
    pub observed_bandwidth: String,
    /// Omitted by gateways that only read back bandwidth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_laser_power: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl ConfigureResponse {
    /// A `configured` response.
    pub fn configured(
        observed_bandwidth: impl Into<String>,
        observed_laser_power: impl Into<String>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            status: STATUS_CONFIGURED.to_string(),
            observed_bandwidth: observed_bandwidth.into(),
            observed_laser_power: Some(observed_laser_power.into()),
            last_updated,
        }
    }
}

/// Remove a device's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeconfigureRequest {
    #[serde(alias = "hostname")]
    pub identifier: DeviceId,
}

/// Acknowledgement of a deconfigure call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeconfigureResponse {
    pub status: String,
    #[serde(alias = "hostname")]
    pub identifier: DeviceId,
}

impl DeconfigureResponse {
    /// A `deconfigured` acknowledgement.
    #[must_use]
    pub fn deconfigured(identifier: DeviceId) -> Self {
        Self {
            status: STATUS_DECONFIGURED.to_string(),
            identifier,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_configure_request_wire_names() {
        let request = ConfigureRequest {
            identifier: DeviceId::new("laser-a1.site1"),
            port: 830,
            bandwidth: "100Gbps".to_string(),
            laser_power: "15dBm".to_string(),
            channel: None,
        };
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["identifier"], "laser-a1.site1");
        assert_eq!(value["laserPower"], "15dBm");
        assert!(value.get("channel").is_none());
    }

    #[test]
    fn test_hostname_alias_is_accepted() {
        let json = r#"{"hostname":"laser-a1.site1","port":830,"bandwidth":"100Gbps","laserPower":"15dBm"}"#;
        let request: ConfigureRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.identifier.as_str(), "laser-a1.site1");
    }

    #[test]
    fn test_response_without_laser_power() {
        let json = r#"{"status":"configured","observedBandwidth":"100Gbps","lastUpdated":"2025-06-01T12:00:00Z"}"#;
        let response: ConfigureResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.status, STATUS_CONFIGURED);
        assert_eq!(response.observed_laser_power, None);
    }

    #[test]
    fn test_deconfigure_response_accepts_hostname() {
        let json = r#"{"status": "deconfigured", "hostname": "laser-a1.site1"}"#;
        let response: DeconfigureResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.identifier, DeviceId::new("laser-a1.site1"));
    }
}
