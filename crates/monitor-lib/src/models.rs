//! Core data models for the system monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Network interface counters, summed over all interfaces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

/// A point-in-time observation of host resource usage
///
/// Every field falls back to its zero value when absent, so partially
/// populated samples (e.g. from JSON fixtures) are always usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub cpu_count: u32,
    pub memory_percent: f64,
    pub memory_total: u64,
    pub memory_available: u64,
    pub memory_used: u64,
    pub disk_percent: f64,
    pub disk_total: u64,
    pub disk_used: u64,
    pub disk_free: u64,
    pub network: NetworkCounters,
}

impl MetricSample {
    /// Utilization-only view of this sample
    pub fn usage(&self) -> UsageView {
        UsageView {
            cpu_percent: self.cpu_percent,
            memory_percent: self.memory_percent,
            disk_percent: self.disk_percent,
        }
    }

    /// Read one utilization percentage
    pub fn value_of(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Cpu => self.cpu_percent,
            MetricKind::Memory => self.memory_percent,
            MetricKind::Disk => self.disk_percent,
        }
    }
}

/// The three utilization percentages of a sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageView {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

/// Utilization dimensions tracked by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [MetricKind::Cpu, MetricKind::Memory, MetricKind::Disk];

    /// Human-readable label used in alert messages
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU",
            MetricKind::Memory => "Memory",
            MetricKind::Disk => "Disk",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Cpu => write!(f, "cpu"),
            MetricKind::Memory => write!(f, "memory"),
            MetricKind::Disk => write!(f, "disk"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_zero() {
        let sample: MetricSample = serde_json::from_str(r#"{"cpu_percent": 10.0}"#).unwrap();

        assert_eq!(sample.cpu_percent, 10.0);
        assert_eq!(sample.memory_percent, 0.0);
        assert_eq!(sample.disk_percent, 0.0);
        assert_eq!(sample.network, NetworkCounters::default());
    }

    #[test]
    fn test_sample_serializes_flat_fields() {
        let sample = MetricSample {
            cpu_percent: 12.5,
            cpu_count: 4,
            ..Default::default()
        };

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["cpu_percent"], 12.5);
        assert_eq!(json["cpu_count"], 4);
        assert!(json["timestamp"].is_string());
        assert_eq!(json["network"]["bytes_sent"], 0);
    }

    #[test]
    fn test_value_of_selects_dimension() {
        let sample = MetricSample {
            cpu_percent: 1.0,
            memory_percent: 2.0,
            disk_percent: 3.0,
            ..Default::default()
        };

        assert_eq!(sample.value_of(MetricKind::Cpu), 1.0);
        assert_eq!(sample.value_of(MetricKind::Memory), 2.0);
        assert_eq!(sample.value_of(MetricKind::Disk), 3.0);
    }
}
