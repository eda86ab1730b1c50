//! The `OpticalDevice` resource: desired configuration and observed status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::condition::{CONDITION_READY, ConditionSet, ConditionStatus, REASON_INVALID_CONFIGURATION};
use crate::error::Error;

/// Namespace assumed when a key carries none.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Identifies a resource within the resource API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    /// Create a key from namespace and name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ObjectKey {
    type Err = Error;

    /// Parse `namespace/name`, or a bare `name` in the default namespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [name] if !name.is_empty() => Ok(Self::new(DEFAULT_NAMESPACE, *name)),
            [namespace, name] if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(*namespace, *name))
            }
            [_] | [_, _] => Err(Error::invalid_key(s, "empty segment")),
            _ => Err(Error::invalid_key(s, "expected 'namespace/name'")),
        }
    }
}

/// Metadata maintained by the resource API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Incremented on every spec change.
    #[serde(default)]
    pub generation: i64,
    /// Incremented on every write; used for optimistic concurrency.
    #[serde(default)]
    pub resource_version: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl ObjectMeta {
    /// Create metadata for a new object.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            generation: 0,
            resource_version: 0,
            finalizers: Vec::new(),
            deletion_timestamp: None,
        }
    }

    /// The key of the object this metadata belongs to.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Whether `finalizer` is present.
    #[must_use]
    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.iter().any(|f| f == finalizer)
    }
}

/// Connection details of the local controller in front of the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfig {
    /// Hostname or IP address; doubles as the device identifier.
    pub hostname: String,
    /// Management port.
    pub port: u16,
}

/// Hardware parameters the operator asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpticalParameters {
    /// e.g. `100Gbps`.
    pub bandwidth: String,
    /// e.g. `14.5dBm`.
    pub laser_power: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u32>,
}

/// Desired configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpticalDeviceSpec {
    #[serde(default)]
    pub location: String,
    pub controller_config: ControllerConfig,
    pub parameters: OpticalParameters,
}

/// Observed state, written only by the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpticalDeviceStatus {
    #[serde(default, skip_serializing_if = "ConditionSet::is_empty")]
    pub conditions: ConditionSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_bandwidth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_laser_power: Option<String>,
    /// Device identifier the observed values were read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Generation the current conditions were computed for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Failed cycles since the last success; drives retry backoff.
    #[serde(default)]
    pub consecutive_failures: u32,
}

/// An optical device under management.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpticalDevice {
    pub metadata: ObjectMeta,
    pub spec: OpticalDeviceSpec,
    #[serde(default)]
    pub status: OpticalDeviceStatus,
}

impl OpticalDevice {
    /// Create a device resource with empty status.
    #[must_use]
    pub fn new(metadata: ObjectMeta, spec: OpticalDeviceSpec) -> Self {
        Self {
            metadata,
            spec,
            status: OpticalDeviceStatus::default(),
        }
    }

    /// Key of this resource.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// Device identifier used toward the hardware gateway.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.spec.controller_config.hostname
    }

    /// Whether deletion has been requested.
    #[must_use]
    pub const fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Whether the current generation was already rejected as invalid.
    ///
    /// Such a resource is not retried until its spec changes.
    #[must_use]
    pub fn is_rejected_for_current_generation(&self) -> bool {
        self.status.observed_generation == Some(self.metadata.generation)
            && self.status.conditions.get(CONDITION_READY).is_some_and(|c| {
                c.status == ConditionStatus::False && c.reason == REASON_INVALID_CONFIGURATION
            })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn device() -> OpticalDevice {
        OpticalDevice::new(
            ObjectMeta::new("default", "test-device"),
            OpticalDeviceSpec {
                location: "site1".to_string(),
                controller_config: ControllerConfig {
                    hostname: "laser-a1.site1".to_string(),
                    port: 830,
                },
                parameters: OpticalParameters {
                    bandwidth: "100Gbps".to_string(),
                    laser_power: "15dBm".to_string(),
                    channel: None,
                },
            },
        )
    }

    #[test]
    fn test_key_parsing() {
        let key: ObjectKey = "lab/laser-a1".parse().unwrap();
        assert_eq!(key, ObjectKey::new("lab", "laser-a1"));

        let bare: ObjectKey = "laser-a1".parse().unwrap();
        assert_eq!(bare.namespace, DEFAULT_NAMESPACE);

        assert!("a/b/c".parse::<ObjectKey>().is_err());
        assert!("/b".parse::<ObjectKey>().is_err());
        assert!("".parse::<ObjectKey>().is_err());
    }

    #[test]
    fn test_key_display_round_trips() {
        let key = ObjectKey::new("lab", "laser-a1");
        assert_eq!(key.to_string().parse::<ObjectKey>().unwrap(), key);
    }

    #[test]
    fn test_device_id_is_hostname() {
        assert_eq!(device().device_id(), "laser-a1.site1");
    }

    #[test]
    fn test_json_uses_camel_case() {
        let value = serde_json::to_value(device()).unwrap();
        assert_eq!(value["spec"]["controllerConfig"]["hostname"], "laser-a1.site1");
        assert_eq!(value["spec"]["parameters"]["laserPower"], "15dBm");
        assert!(value["spec"]["parameters"].get("channel").is_none());
    }

    #[test]
    fn test_rejected_only_for_matching_generation() {
        let mut d = device();
        d.metadata.generation = 2;
        d.status.observed_generation = Some(2);
        d.status.conditions.upsert(
            CONDITION_READY,
            ConditionStatus::False,
            REASON_INVALID_CONFIGURATION,
            "bad bandwidth",
            Utc::now(),
        );
        assert!(d.is_rejected_for_current_generation());

        d.metadata.generation = 3;
        assert!(!d.is_rejected_for_current_generation());
    }
}
