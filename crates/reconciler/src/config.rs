//! Reconciler configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::BackoffPolicy;
use crate::error::{Error, Result};

/// Configuration for the reconciler and its work loop.
///
/// Loaded from TOML; every field has a default:
///
/// ```toml
/// gateway_timeout_ms = 10000
/// resync_interval_secs = 300
/// backoff_base_secs = 5
/// backoff_max_secs = 300
/// workers = 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Upper bound on a single gateway call.
    #[serde(default = "default_gateway_timeout_ms")]
    pub gateway_timeout_ms: u64,

    /// Periodic resync after a successful reconciliation.
    #[serde(default = "default_resync_interval_secs")]
    pub resync_interval_secs: u64,

    /// First retry delay after a transient failure.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    /// Retry delay ceiling.
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    /// Number of concurrent workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

const fn default_gateway_timeout_ms() -> u64 {
    10_000
}

const fn default_resync_interval_secs() -> u64 {
    300
}

const fn default_backoff_base_secs() -> u64 {
    5
}

const fn default_backoff_max_secs() -> u64 {
    300
}

const fn default_workers() -> usize {
    4
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            gateway_timeout_ms: default_gateway_timeout_ms(),
            resync_interval_secs: default_resync_interval_secs(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            workers: default_workers(),
        }
    }
}

impl ReconcilerConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the document does not parse or a
    /// value is out of range.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::invalid_config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.gateway_timeout_ms == 0 {
            return Err(Error::invalid_config(
                "gateway_timeout_ms must be greater than 0",
            ));
        }
        if self.resync_interval_secs == 0 {
            return Err(Error::invalid_config(
                "resync_interval_secs must be greater than 0",
            ));
        }
        if self.backoff_base_secs == 0 {
            return Err(Error::invalid_config(
                "backoff_base_secs must be greater than 0",
            ));
        }
        if self.backoff_max_secs < self.backoff_base_secs {
            return Err(Error::invalid_config(
                "backoff_max_secs must not be less than backoff_base_secs",
            ));
        }
        if self.workers == 0 {
            return Err(Error::invalid_config("workers must be greater than 0"));
        }
        Ok(())
    }

    /// Override the worker count.
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub const fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }

    #[must_use]
    pub const fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Backoff policy for transient failures.
    #[must_use]
    pub const fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_secs(self.backoff_base_secs),
            Duration::from_secs(self.backoff_max_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.gateway_timeout(), Duration::from_secs(10));
        assert_eq!(config.resync_interval(), Duration::from_secs(300));
        assert_eq!(config.workers, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ReconcilerConfig::from_toml_str("workers = 8\ngateway_timeout_ms = 500").unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.gateway_timeout(), Duration::from_millis(500));
        assert_eq!(config.backoff_base_secs, 5);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(
            ReconcilerConfig::from_toml_str("").unwrap(),
            ReconcilerConfig::default()
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ReconcilerConfig::from_toml_str("workers = 0").is_err());
        assert!(
            ReconcilerConfig::from_toml_str("backoff_base_secs = 60\nbackoff_max_secs = 10")
                .is_err()
        );
        assert!(ReconcilerConfig::from_toml_str("workers = \"many\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reconciler.toml");
        std::fs::write(&path, "resync_interval_secs = 60\n").unwrap();

        let config = ReconcilerConfig::load(&path).unwrap();
        assert_eq!(config.resync_interval(), Duration::from_secs(60));

        assert!(ReconcilerConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
