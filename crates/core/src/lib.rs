//! Core types for optical device management.
//!
//! - [`resource`]: the `OpticalDevice` resource (desired spec + observed status)
//! - [`condition`]: ordered, de-duplicated status conditions
//! - [`manifest`]: YAML and JSON manifest loading
//! - [`error`]: core error types

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod condition;
pub mod error;
pub mod manifest;
pub mod resource;

pub use condition::{
    CONDITION_READY, Condition, ConditionSet, ConditionStatus, REASON_INVALID_CONFIGURATION,
    REASON_RECONCILIATION_SUCCESS, REASON_TRANSIENT_ERROR,
};
pub use error::{Error, Result};
pub use manifest::{load_manifest, parse_manifest, parse_manifest_json, validate_manifest};
pub use resource::{
    ControllerConfig, DEFAULT_NAMESPACE, ObjectKey, ObjectMeta, OpticalDevice,
    OpticalDeviceSpec, OpticalDeviceStatus, OpticalParameters,
};
