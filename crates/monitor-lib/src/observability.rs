//! Observability infrastructure for the system monitor
//!
//! Provides:
//! - Prometheus metrics (sampling latency, detection latency, history size, alerts)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::anomaly::{Alert, AlertSeverity, AnomalyResult};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    sample_latency_seconds: Histogram,
    detection_latency_seconds: Histogram,
    history_size: IntGauge,
    samples_recorded: IntCounter,
    degraded_samples: IntCounter,
    anomalies_detected: IntCounter,
    active_alerts: IntGauge,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            sample_latency_seconds: register_histogram!(
                "system_monitor_sample_latency_seconds",
                "Time spent sampling host metrics",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register sample_latency_seconds"),

            detection_latency_seconds: register_histogram!(
                "system_monitor_detection_latency_seconds",
                "Time spent fitting and scoring the outlier model",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register detection_latency_seconds"),

            history_size: register_int_gauge!(
                "system_monitor_history_size",
                "Number of samples currently retained in history"
            )
            .expect("Failed to register history_size"),

            samples_recorded: register_int_counter!(
                "system_monitor_samples_recorded_total",
                "Total number of samples recorded into history"
            )
            .expect("Failed to register samples_recorded"),

            degraded_samples: register_int_counter!(
                "system_monitor_degraded_samples_total",
                "Total number of samples with at least one zeroed source"
            )
            .expect("Failed to register degraded_samples"),

            anomalies_detected: register_int_counter!(
                "system_monitor_anomalies_detected_total",
                "Total number of outliers reported by detection passes"
            )
            .expect("Failed to register anomalies_detected"),

            active_alerts: register_int_gauge!(
                "system_monitor_active_alerts",
                "Number of threshold alerts raised by the latest check"
            )
            .expect("Failed to register active_alerts"),
        }
    }
}

/// Handle to the process-wide Prometheus metrics
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a metrics handle (registers the metrics on first call)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    pub fn observe_sample_latency(&self, duration_secs: f64) {
        self.inner().sample_latency_seconds.observe(duration_secs);
    }

    pub fn observe_detection_latency(&self, duration_secs: f64) {
        self.inner().detection_latency_seconds.observe(duration_secs);
    }

    pub fn set_history_size(&self, entries: usize) {
        self.inner().history_size.set(entries as i64);
    }

    pub fn inc_samples_recorded(&self) {
        self.inner().samples_recorded.inc();
    }

    pub fn inc_degraded_samples(&self) {
        self.inner().degraded_samples.inc();
    }

    pub fn add_anomalies_detected(&self, count: usize) {
        self.inner().anomalies_detected.inc_by(count as u64);
    }

    pub fn set_active_alerts(&self, count: usize) {
        self.inner().active_alerts.set(count as i64);
    }
}

/// Structured logger for monitor events
///
/// Every record carries an `event` tag and the host it describes.
#[derive(Clone)]
pub struct StructuredLogger {
    host: String,
}

impl StructuredLogger {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn log_startup(&self, version: &str, history_size: usize, contamination: f64) {
        info!(
            event = "monitor_started",
            host = %self.host,
            version = %version,
            history_size = history_size,
            contamination = contamination,
            "System monitor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            host = %self.host,
            reason = %reason,
            "System monitor shutting down"
        );
    }

    /// Log a detection pass that flagged at least one sample
    pub fn log_anomalies(&self, result: &AnomalyResult) {
        let worst_score = result
            .anomalies
            .iter()
            .map(|a| a.score)
            .fold(f64::INFINITY, f64::min);

        warn!(
            event = "anomalies_detected",
            host = %self.host,
            anomaly_count = result.anomaly_count,
            total_points = result.total_points,
            anomaly_rate = result.anomaly_rate,
            worst_score = worst_score,
            "Outlier samples detected"
        );
    }

    pub fn log_alert(&self, alert: &Alert) {
        match alert.severity {
            AlertSeverity::Critical => {
                warn!(
                    event = "threshold_alert",
                    host = %self.host,
                    resource = %alert.kind,
                    severity = %alert.severity,
                    value = alert.value,
                    threshold = alert.threshold,
                    "Critical resource alert"
                );
            }
            AlertSeverity::Warning => {
                info!(
                    event = "threshold_alert",
                    host = %self.host,
                    resource = %alert.kind,
                    severity = %alert.severity,
                    value = alert.value,
                    threshold = alert.threshold,
                    "Resource alert"
                );
            }
        }
    }

    pub fn log_sampler_degraded(&self, fallbacks: &str) {
        warn!(
            event = "sampler_degraded",
            host = %self.host,
            fallbacks = %fallbacks,
            "Sampler fell back to zeroed fields"
        );
    }
}
