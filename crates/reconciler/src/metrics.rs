//! Reconciler metrics.
//!
//! Held in an explicit [`Registry`] owned by [`ReconcilerMetrics`]; nothing is
//! registered globally, so independent reconcilers (and tests) do not share
//! series.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Metric Names
// ============================================================================

/// 1 while a device is configured with a bandwidth.
pub const DEVICE_CONFIGURED: &str = "optical_device_configured";

/// Successful reconciliations.
pub const RECONCILE_SUCCESS_TOTAL: &str = "optical_reconcile_success_total";

/// Failed reconciliations, by error kind.
pub const RECONCILE_ERRORS_TOTAL: &str = "optical_reconcile_errors_total";

/// Metrics emitted by the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerMetrics {
    registry: Registry,
    configured: IntGaugeVec,
    successes: IntCounter,
    errors: IntCounterVec,
}

impl ReconcilerMetrics {
    /// Create the metrics in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns `Error::Metrics` if a metric cannot be created or registered.
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Create the metrics in `registry`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Metrics` if a metric cannot be created or registered.
    pub fn with_registry(registry: Registry) -> Result<Self> {
        let configured = IntGaugeVec::new(
            Opts::new(DEVICE_CONFIGURED, "Device configured with the given bandwidth"),
            &["identifier", "bandwidth"],
        )
        .map_err(|e| Error::metrics(e.to_string()))?;
        let successes = IntCounter::new(RECONCILE_SUCCESS_TOTAL, "Successful reconciliations")
            .map_err(|e| Error::metrics(e.to_string()))?;
        let errors = IntCounterVec::new(
            Opts::new(RECONCILE_ERRORS_TOTAL, "Failed reconciliations by error kind"),
            &["kind"],
        )
        .map_err(|e| Error::metrics(e.to_string()))?;

        registry
            .register(Box::new(configured.clone()))
            .map_err(|e| Error::metrics(e.to_string()))?;
        registry
            .register(Box::new(successes.clone()))
            .map_err(|e| Error::metrics(e.to_string()))?;
        registry
            .register(Box::new(errors.clone()))
            .map_err(|e| Error::metrics(e.to_string()))?;

        Ok(Self {
            registry,
            configured,
            successes,
            errors,
        })
    }

    /// The registry holding these metrics.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_configured(&self, identifier: &str, bandwidth: &str) {
        self.configured
            .with_label_values(&[identifier, bandwidth])
            .set(1);
    }

    pub fn forget_configured(&self, identifier: &str, bandwidth: &str) {
        if self
            .configured
            .remove_label_values(&[identifier, bandwidth])
            .is_err()
        {
            debug!(identifier, bandwidth, "No configured series to remove");
        }
    }

    pub fn record_success(&self) {
        self.successes.inc();
    }

    pub fn record_error(&self, kind: &str) {
        self.errors.with_label_values(&[kind]).inc();
    }

    #[must_use]
    pub fn success_count(&self) -> u64 {
        self.successes.get()
    }

    #[must_use]
    pub fn error_count(&self, kind: &str) -> u64 {
        self.errors.with_label_values(&[kind]).get()
    }

    /// `(identifier, bandwidth)` pairs currently reported as configured.
    #[must_use]
    pub fn configured_series(&self) -> Vec<(String, String)> {
        let mut series: Vec<(String, String)> = self
            .registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == DEVICE_CONFIGURED)
            .flat_map(|family| family.get_metric().iter())
            .filter_map(|metric| {
                let label = |name: &str| {
                    metric
                        .get_label()
                        .iter()
                        .find(|pair| pair.get_name() == name)
                        .map(|pair| pair.get_value().to_string())
                };
                Some((label("identifier")?, label("bandwidth")?))
            })
            .collect();
        series.sort();
        series
    }

    /// Text exposition of all metrics.
    ///
    /// # Errors
    ///
    /// Returns `Error::Metrics` if encoding fails.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| Error::metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| Error::metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_configured_series_lifecycle() {
        let metrics = ReconcilerMetrics::new().unwrap();

        metrics.record_configured("laser-a1", "100Gbps");
        metrics.record_configured("laser-b2", "400Gbps");
        assert_eq!(
            metrics.configured_series(),
            vec![
                ("laser-a1".to_string(), "100Gbps".to_string()),
                ("laser-b2".to_string(), "400Gbps".to_string()),
            ]
        );

        metrics.forget_configured("laser-a1", "100Gbps");
        metrics.forget_configured("laser-a1", "100Gbps");
        assert_eq!(metrics.configured_series().len(), 1);
    }

    #[test]
    fn test_counters() {
        let metrics = ReconcilerMetrics::new().unwrap();
        metrics.record_success();
        metrics.record_success();
        metrics.record_error("transient");

        assert_eq!(metrics.success_count(), 2);
        assert_eq!(metrics.error_count("transient"), 1);
        assert_eq!(metrics.error_count("permanent"), 0);
    }

    #[test]
    fn test_render_text_format() {
        let metrics = ReconcilerMetrics::new().unwrap();
        metrics.record_configured("laser-a1", "100Gbps");
        metrics.record_success();

        let text = metrics.render().unwrap();
        assert!(text.contains("optical_reconcile_success_total 1"));
        let line = text
            .lines()
            .find(|l| l.starts_with("optical_device_configured{"))
            .unwrap();
        assert!(line.contains(r#"identifier="laser-a1""#));
        assert!(line.contains(r#"bandwidth="100Gbps""#));
        assert!(line.ends_with(" 1"));
    }

    #[test]
    fn test_instances_are_independent() {
        let a = ReconcilerMetrics::new().unwrap();
        let b = ReconcilerMetrics::new().unwrap();
        a.record_success();
        assert_eq!(b.success_count(), 0);
    }
}
