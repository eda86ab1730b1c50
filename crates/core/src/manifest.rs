//! Loading `OpticalDevice` resources from manifests.
//!
//! A YAML manifest holds one or more documents separated by `---`; a JSON
//! manifest holds one object or an array of them. Fields the resource does
//! not model (`apiVersion`, `kind`, labels) are ignored.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::resource::OpticalDevice;

/// Parse every non-empty document of a manifest.
///
/// # Errors
///
/// Returns `YamlParseFailed` if any document is malformed or does not
/// describe an `OpticalDevice`.
pub fn parse_manifest(content: &str) -> Result<Vec<OpticalDevice>> {
    serde_yaml::Deserializer::from_str(content)
        .map(|document| {
            serde_yaml::Value::deserialize(document)
                .map_err(|e| Error::yaml_parse_failed(e.to_string()))
        })
        .filter(|value| !matches!(value, Ok(serde_yaml::Value::Null)))
        .map(|value| {
            value.and_then(|v| {
                serde_yaml::from_value::<OpticalDevice>(v)
                    .map_err(|e| Error::yaml_parse_failed(e.to_string()))
            })
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonManifest {
    Many(Vec<OpticalDevice>),
    One(Box<OpticalDevice>),
}

/// Parse a JSON manifest: a single resource or an array of resources.
///
/// # Errors
///
/// Returns `JsonParseFailed` if the content is not a resource or an array of
/// resources.
pub fn parse_manifest_json(content: &str) -> Result<Vec<OpticalDevice>> {
    match serde_json::from_str::<JsonManifest>(content) {
        Ok(JsonManifest::Many(devices)) => Ok(devices),
        Ok(JsonManifest::One(device)) => Ok(vec![*device]),
        Err(e) => Err(Error::json_parse_failed(e.to_string())),
    }
}

/// Check the resources of one manifest for missing identity fields and
/// duplicate keys.
///
/// # Errors
///
/// Returns `InvalidResource` naming the first offending resource.
pub fn validate_manifest(devices: &[OpticalDevice]) -> Result<()> {
    let mut seen = HashSet::new();
    for device in devices {
        let key = device.key();
        if device.metadata.name.trim().is_empty() {
            return Err(Error::invalid_resource("metadata.name cannot be empty"));
        }
        if device.device_id().trim().is_empty() {
            return Err(Error::invalid_resource(format!(
                "{key}: spec.controllerConfig.hostname cannot be empty"
            )));
        }
        if !seen.insert(key.clone()) {
            return Err(Error::invalid_resource(format!("{key}: declared more than once")));
        }
    }
    Ok(())
}

/// Read, parse and validate a manifest file. Files ending in `.json` are
/// parsed as JSON, everything else as YAML.
///
/// # Errors
///
/// Returns `FileReadFailed` if the file cannot be read, a parse error, or
/// `InvalidResource`.
pub fn load_manifest(path: &Path) -> Result<Vec<OpticalDevice>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::file_read_failed(path, e.to_string()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let devices = if is_json {
        parse_manifest_json(&content)?
    } else {
        parse_manifest(&content)?
    };
    validate_manifest(&devices)?;
    debug!(path = %path.display(), count = devices.len(), "Loaded manifest");
    Ok(devices)
}
