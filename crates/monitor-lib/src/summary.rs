//! Summary statistics over the metric history

use serde::{Deserialize, Serialize};

use crate::models::{MetricKind, MetricSample};

/// Current, mean and range of one resource
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub current: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// Per-resource summary of the retained history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub cpu: MetricSummary,
    pub memory: MetricSummary,
    pub disk: MetricSummary,
    pub samples: usize,
}

/// Summarize the history, `None` when it is empty
pub fn summarize(history: &[MetricSample]) -> Option<HistorySummary> {
    if history.is_empty() {
        return None;
    }

    Some(HistorySummary {
        cpu: summarize_kind(history, MetricKind::Cpu)?,
        memory: summarize_kind(history, MetricKind::Memory)?,
        disk: summarize_kind(history, MetricKind::Disk)?,
        samples: history.len(),
    })
}

fn summarize_kind(history: &[MetricSample], kind: MetricKind) -> Option<MetricSummary> {
    let current = history.last()?.value_of(kind);
    let values = history.iter().map(|s| s.value_of(kind));

    let (sum, min, max) = values.fold(
        (0.0, f64::INFINITY, f64::NEG_INFINITY),
        |(sum, min, max), v| (sum + v, min.min(v), max.max(v)),
    );

    Some(MetricSummary {
        current,
        avg: sum / history.len() as f64,
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(cpu: f64, memory: f64, disk: f64) -> MetricSample {
        MetricSample {
            cpu_percent: cpu,
            memory_percent: memory,
            disk_percent: disk,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_history_has_no_summary() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_summary_statistics() {
        let history = vec![
            sample(10.0, 50.0, 30.0),
            sample(30.0, 40.0, 30.0),
            sample(20.0, 60.0, 30.0),
        ];

        let summary = summarize(&history).unwrap();
        assert_eq!(summary.samples, 3);
        assert_eq!(summary.cpu.current, 20.0);
        assert_eq!(summary.cpu.avg, 20.0);
        assert_eq!(summary.cpu.min, 10.0);
        assert_eq!(summary.cpu.max, 30.0);
        assert_eq!(summary.memory.min, 40.0);
        assert_eq!(summary.memory.max, 60.0);
        assert_eq!(summary.disk.avg, 30.0);
    }
}
