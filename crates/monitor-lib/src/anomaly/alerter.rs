//! Threshold alerts for the latest sample
//!
//! A utilization value strictly above its configured threshold raises an
//! alert. Severity escalates to critical at a fixed per-resource level.

use serde::{Deserialize, Serialize};

use crate::models::{MetricKind, MetricSample};

/// Severity at or above which CPU alerts are critical
const CPU_CRITICAL_PERCENT: f64 = 90.0;

/// Severity at or above which memory and disk alerts are critical
const STORAGE_CRITICAL_PERCENT: f64 = 95.0;

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Per-resource alert thresholds, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu: 80.0,
            memory: 85.0,
            disk: 90.0,
        }
    }
}

impl AlertThresholds {
    pub fn threshold(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Cpu => self.cpu,
            MetricKind::Memory => self.memory,
            MetricKind::Disk => self.disk,
        }
    }
}

/// An active threshold alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
}

/// Alerts raised for one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertReport {
    pub alerts: Vec<Alert>,
    pub count: usize,
}

impl AlertReport {
    fn new(alerts: Vec<Alert>) -> Self {
        let count = alerts.len();
        Self { alerts, count }
    }
}

/// Evaluates samples against alert thresholds
#[derive(Debug, Clone, Default)]
pub struct Alerter {
    thresholds: AlertThresholds,
}

impl Alerter {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Check every resource of `sample`, in CPU, memory, disk order
    pub fn evaluate(&self, sample: &MetricSample) -> AlertReport {
        let alerts = MetricKind::ALL
            .iter()
            .filter_map(|&kind| self.check(kind, sample.value_of(kind)))
            .collect();
        AlertReport::new(alerts)
    }

    fn check(&self, kind: MetricKind, value: f64) -> Option<Alert> {
        let threshold = self.thresholds.threshold(kind);
        if value <= threshold {
            return None;
        }

        Some(Alert {
            kind,
            severity: severity_for(kind, value),
            message: format!("{} usage is high: {:.1}%", kind.label(), value),
            value,
            threshold,
        })
    }
}

fn severity_for(kind: MetricKind, value: f64) -> AlertSeverity {
    let critical_at = match kind {
        MetricKind::Cpu => CPU_CRITICAL_PERCENT,
        MetricKind::Memory | MetricKind::Disk => STORAGE_CRITICAL_PERCENT,
    };
    if value < critical_at {
        AlertSeverity::Warning
    } else {
        AlertSeverity::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(cpu: f64, memory: f64, disk: f64) -> MetricSample {
        MetricSample {
            cpu_percent: cpu,
            memory_percent: memory,
            disk_percent: disk,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_alerts_below_thresholds() {
        let report = Alerter::default().evaluate(&usage(20.0, 40.0, 50.0));
        assert!(report.alerts.is_empty());
        assert_eq!(report.count, 0);
    }

    #[test]
    fn test_value_at_threshold_does_not_alert() {
        let report = Alerter::default().evaluate(&usage(80.0, 85.0, 90.0));
        assert_eq!(report.count, 0);
    }

    #[test]
    fn test_cpu_warning_and_critical() {
        let alerter = Alerter::default();

        let report = alerter.evaluate(&usage(85.0, 10.0, 10.0));
        assert_eq!(report.count, 1);
        assert_eq!(report.alerts[0].kind, MetricKind::Cpu);
        assert_eq!(report.alerts[0].severity, AlertSeverity::Warning);
        assert_eq!(report.alerts[0].message, "CPU usage is high: 85.0%");

        let report = alerter.evaluate(&usage(90.0, 10.0, 10.0));
        assert_eq!(report.alerts[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_memory_and_disk_escalate_at_95() {
        let alerter = Alerter::default();

        let report = alerter.evaluate(&usage(10.0, 94.9, 96.0));
        assert_eq!(report.count, 2);
        assert_eq!(report.alerts[0].kind, MetricKind::Memory);
        assert_eq!(report.alerts[0].severity, AlertSeverity::Warning);
        assert_eq!(report.alerts[1].kind, MetricKind::Disk);
        assert_eq!(report.alerts[1].severity, AlertSeverity::Critical);
        assert_eq!(report.alerts[1].threshold, 90.0);
    }

    #[test]
    fn test_custom_thresholds() {
        let alerter = Alerter::new(AlertThresholds {
            cpu: 10.0,
            memory: 10.0,
            disk: 10.0,
        });

        let report = alerter.evaluate(&usage(11.0, 12.0, 13.0));
        assert_eq!(report.count, 3);
        assert!(report
            .alerts
            .iter()
            .all(|a| a.severity == AlertSeverity::Warning && a.threshold == 10.0));
    }

    #[test]
    fn test_alert_serialization() {
        let report = Alerter::default().evaluate(&usage(99.0, 10.0, 10.0));
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["count"], 1);
        assert_eq!(json["alerts"][0]["type"], "cpu");
        assert_eq!(json["alerts"][0]["severity"], "critical");
        assert_eq!(json["alerts"][0]["threshold"], 80.0);
    }
}
