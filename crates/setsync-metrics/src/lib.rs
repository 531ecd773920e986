//! Metric declarations for setting synchronization.
//!
//! Every metric the workspace emits is declared here as a [`Metric`] constant
//! so names and label keys cannot drift between emitters. Emission goes
//! through the `metrics` facade; without an installed recorder it is a no-op.
//!
//! # Example
//!
//! ```rust
//! use setsync_metrics::{metric_defs, MetricLabels};
//!
//! let labels = MetricLabels::new("anafi-01", "thermal");
//! metrics::counter!(metric_defs::COMMANDS_SENT.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonically increasing.
    Counter,
    /// Can go up and down.
    Gauge,
    /// Distribution of recorded values.
    Histogram,
}

impl MetricKind {
    /// Lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use setsync_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const RETRIES: Metric = Metric::counter("example.retries")
///     .with_description("Retries attempted")
///     .with_unit(Unit::Count)
///     .with_labels(&["device"]);
///
/// assert_eq!(RETRIES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// Metric name, e.g. `setsync.commands.sent`.
    pub name: &'static str,
    /// Counter, gauge or histogram.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Unit of measurement.
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// A counter called `name`.
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// A gauge called `name`.
    pub const fn gauge(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Gauge,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// A histogram called `name`.
    pub const fn histogram(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Set the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Set the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Set the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register the description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// Every metric emitted by the workspace.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Standard Label Keys
    // ========================================================================

    /// Labels present on every metric.
    pub const STANDARD_LABELS: &[&str] = &["device", "component"];

    // ========================================================================
    // Command / Report Traffic
    // ========================================================================

    /// Commands handed to the command sender.
    ///
    /// Labels: device, component, command
    pub const COMMANDS_SENT: Metric = Metric::counter("setsync.commands.sent")
        .with_description("Commands handed to the command sender")
        .with_unit(Unit::Count)
        .with_labels(&["device", "component", "command"]);

    /// Events routed to a peripheral.
    ///
    /// Labels: device, component, event
    pub const REPORTS_RECEIVED: Metric = Metric::counter("setsync.reports.received")
        .with_description("Device reports routed to a peripheral")
        .with_unit(Unit::Count)
        .with_labels(&["device", "component", "event"]);

    // ========================================================================
    // Settings
    // ========================================================================

    /// User requests refused locally (unsupported value, invalid input).
    ///
    /// Labels: device, component, setting
    pub const REQUESTS_REJECTED: Metric = Metric::counter("setsync.requests.rejected")
        .with_description("User requests refused without contacting the device")
        .with_unit(Unit::Count)
        .with_labels(&["device", "component", "setting"]);

    /// Lists atomically replaced after a complete sequence.
    ///
    /// Labels: device, component, setting
    pub const LISTS_COMMITTED: Metric = Metric::counter("setsync.lists.committed")
        .with_description("Incremental lists committed")
        .with_unit(Unit::Count)
        .with_labels(&["device", "component", "setting"]);

    // ========================================================================
    // Components
    // ========================================================================

    /// Components currently published.
    ///
    /// Labels: device, component
    pub const COMPONENTS_PUBLISHED: Metric = Metric::gauge("setsync.components.published")
        .with_description("Components currently published")
        .with_unit(Unit::Count)
        .with_labels(&["device", "component"]);

    /// Every metric, for [`describe_metrics`](super::describe_metrics).
    pub const ALL: &[&Metric] = &[
        &COMMANDS_SENT,
        &REPORTS_RECEIVED,
        &REQUESTS_REJECTED,
        &LISTS_COMMITTED,
        &COMPONENTS_PUBLISHED,
    ];
}

/// Labels identifying where a metric was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricLabels {
    /// Device uid.
    pub device: String,
    /// Component name, e.g. `thermal`.
    pub component: String,
}

impl MetricLabels {
    /// Labels for `component` of `device`.
    ///
    /// ```rust
    /// use setsync_metrics::MetricLabels;
    ///
    /// let labels = MetricLabels::new("anafi-01", "wifi_access_point");
    /// assert_eq!(labels.component, "wifi_access_point");
    /// ```
    pub fn new(device: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            component: component.into(),
        }
    }

    /// Label pairs in the `metrics` crate format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![
            ("device", self.device.clone()),
            ("component", self.component.clone()),
        ]
    }

    /// Label pairs with `extra` appended.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Register every metric description. Call once after installing a
/// recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_labels() {
        let labels = MetricLabels::new("dev", "thermal");
        let pairs = labels.to_labels();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains(&("device", "dev".to_string())));
        assert!(pairs.contains(&("component", "thermal".to_string())));
    }

    #[test]
    fn test_with_extra_labels() {
        let labels = MetricLabels::new("dev", "thermal");
        let extended = labels.with(&[("command", "set_thermal_mode".to_string())]);
        assert_eq!(extended.len(), 3);
        assert!(extended.contains(&("command", "set_thermal_mode".to_string())));
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::COMMANDS_SENT.name, "setsync.commands.sent");
        assert_eq!(metric_defs::COMMANDS_SENT.kind, MetricKind::Counter);
        assert_eq!(metric_defs::COMPONENTS_PUBLISHED.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::ALL.len(), 5);
        for metric in metric_defs::ALL {
            assert!(metric.name.starts_with("setsync."));
            assert_eq!(&metric.labels[..2], metric_defs::STANDARD_LABELS);
        }
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
