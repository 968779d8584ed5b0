//! Monitor context shared by every request handler
//!
//! Owns the history store and wires the sampler, detector and alerter to the
//! health registry, Prometheus metrics and structured logger.

use std::sync::Arc;
use std::time::Instant;

use crate::anomaly::{
    AlertReport, AlertThresholds, Alerter, AnomalyResult, OutlierDetector, DEFAULT_CONTAMINATION,
};
use crate::health::{components, HealthRegistry};
use crate::history::{HistoryStats, HistoryStore, DEFAULT_HISTORY_SIZE};
use crate::models::MetricSample;
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::predictor::Predictions;
use crate::sampler::{MetricsSampler, SampleOutcome};
use crate::summary::{summarize, HistorySummary};

/// Builder for [`Monitor`]
pub struct MonitorBuilder {
    sampler: Arc<dyn MetricsSampler>,
    history_size: usize,
    contamination: f64,
    thresholds: AlertThresholds,
    health: HealthRegistry,
    logger: StructuredLogger,
}

impl MonitorBuilder {
    pub fn new(sampler: Arc<dyn MetricsSampler>) -> Self {
        Self {
            sampler,
            history_size: DEFAULT_HISTORY_SIZE,
            contamination: DEFAULT_CONTAMINATION,
            thresholds: AlertThresholds::default(),
            health: HealthRegistry::new(),
            logger: StructuredLogger::new("localhost"),
        }
    }

    pub fn history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self
    }

    pub fn contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn health_registry(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn build(self) -> Monitor {
        Monitor {
            sampler: self.sampler,
            history: HistoryStore::new(self.history_size),
            detector: OutlierDetector::new(self.contamination),
            alerter: Alerter::new(self.thresholds),
            health: self.health,
            metrics: MonitorMetrics::new(),
            logger: self.logger,
        }
    }
}

/// Samples the host, keeps the bounded history and answers queries over it
pub struct Monitor {
    sampler: Arc<dyn MetricsSampler>,
    history: HistoryStore,
    detector: OutlierDetector,
    alerter: Alerter,
    health: HealthRegistry,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl Monitor {
    pub fn builder(sampler: Arc<dyn MetricsSampler>) -> MonitorBuilder {
        MonitorBuilder::new(sampler)
    }

    /// Mark every component healthy
    pub async fn register_components(&self) {
        self.health.register(components::SAMPLER).await;
        self.health.register(components::HISTORY).await;
    }

    /// Take a fresh sample and record it
    pub async fn record_current(&self) -> MetricSample {
        let outcome = self.take_sample().await;
        let entries = self.history.record(outcome.sample.clone());
        self.after_record(entries);
        outcome.sample
    }

    /// Take a fresh sample, record it and return the updated history
    pub async fn record_and_snapshot(&self) -> Vec<MetricSample> {
        let outcome = self.take_sample().await;
        let snapshot = self.history.record_and_snapshot(outcome.sample);
        self.after_record(snapshot.len());
        snapshot
    }

    pub fn get_history(&self) -> Vec<MetricSample> {
        self.history.snapshot()
    }

    /// Run outlier detection over the current history
    ///
    /// `None` uses the configured contamination.
    pub fn detect_anomalies(&self, contamination: Option<f64>) -> AnomalyResult {
        let history = self.history.snapshot();
        let contamination = contamination.unwrap_or_else(|| self.detector.contamination());

        let start = Instant::now();
        let result = self.detector.detect_with(&history, contamination);
        self.metrics
            .observe_detection_latency(start.elapsed().as_secs_f64());

        if result.anomaly_count > 0 {
            self.metrics.add_anomalies_detected(result.anomaly_count);
            self.logger.log_anomalies(&result);
        }
        result
    }

    pub fn predictions(&self) -> Predictions {
        Predictions::from_history(&self.history.snapshot())
    }

    /// Sample, record and check the fresh sample against the thresholds
    pub async fn alerts(&self) -> AlertReport {
        let sample = self.record_current().await;
        let report = self.alerter.evaluate(&sample);

        self.metrics.set_active_alerts(report.count);
        for alert in &report.alerts {
            self.logger.log_alert(alert);
        }
        report
    }

    pub fn summary(&self) -> Option<HistorySummary> {
        summarize(&self.history.snapshot())
    }

    /// Drop every retained sample
    pub fn reset(&self) {
        self.history.clear();
        self.metrics.set_history_size(0);
    }

    pub fn history_stats(&self) -> HistoryStats {
        self.history.stats()
    }

    pub fn contamination(&self) -> f64 {
        self.detector.contamination()
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        self.alerter.thresholds()
    }

    pub fn health_registry(&self) -> &HealthRegistry {
        &self.health
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    async fn take_sample(&self) -> SampleOutcome {
        let start = Instant::now();
        let outcome = self.sampler.sample().await;
        self.metrics
            .observe_sample_latency(start.elapsed().as_secs_f64());

        if outcome.is_degraded() {
            let fallbacks = outcome.describe_fallbacks();
            self.metrics.inc_degraded_samples();
            self.logger.log_sampler_degraded(&fallbacks);
            self.health
                .set_degraded(components::SAMPLER, format!("zeroed fields: {fallbacks}"))
                .await;
        } else {
            self.health.set_healthy(components::SAMPLER).await;
        }
        outcome
    }

    fn after_record(&self, entries: usize) {
        self.metrics.inc_samples_recorded();
        self.metrics.set_history_size(entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{AlertSeverity, DetectionStatus};
    use crate::health::ComponentStatus;
    use crate::predictor::Trend;
    use crate::sampler::{async_trait, Fallback};
    use std::sync::Mutex;

    /// Replays a fixed sequence of readings, repeating the last one
    struct ScriptedSampler {
        readings: Vec<(f64, f64, f64)>,
        next: Mutex<usize>,
        fallbacks: Vec<Fallback>,
    }

    impl ScriptedSampler {
        fn new(readings: Vec<(f64, f64, f64)>) -> Self {
            Self {
                readings,
                next: Mutex::new(0),
                fallbacks: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl MetricsSampler for ScriptedSampler {
        async fn sample(&self) -> SampleOutcome {
            let mut next = self.next.lock().unwrap();
            let (cpu, memory, disk) = self.readings[(*next).min(self.readings.len() - 1)];
            *next += 1;

            SampleOutcome {
                sample: MetricSample {
                    timestamp: chrono::Utc::now(),
                    cpu_percent: cpu,
                    cpu_count: 4,
                    memory_percent: memory,
                    disk_percent: disk,
                    ..Default::default()
                },
                fallbacks: self.fallbacks.clone(),
            }
        }
    }

    fn monitor(readings: Vec<(f64, f64, f64)>) -> Monitor {
        Monitor::builder(Arc::new(ScriptedSampler::new(readings))).build()
    }

    #[tokio::test]
    async fn test_record_current_appends_to_history() {
        let monitor = monitor(vec![(10.0, 20.0, 30.0), (11.0, 21.0, 31.0)]);

        let first = monitor.record_current().await;
        let second = monitor.record_current().await;

        let history = monitor.get_history();
        assert_eq!(history, vec![first, second]);
        assert_eq!(history[1].cpu_percent, 11.0);
    }

    #[tokio::test]
    async fn test_record_and_snapshot_respects_capacity() {
        let monitor = Monitor::builder(Arc::new(ScriptedSampler::new(vec![(1.0, 1.0, 1.0)])))
            .history_size(3)
            .build();

        for _ in 0..5 {
            monitor.record_and_snapshot().await;
        }
        let snapshot = monitor.record_and_snapshot().await;

        assert_eq!(snapshot.len(), 3);
        assert_eq!(monitor.history_stats().capacity, 3);
    }

    #[tokio::test]
    async fn test_detect_anomalies_flags_spike() {
        let mut readings = vec![(50.0, 60.0, 40.0); 20];
        readings.push((99.0, 99.0, 99.0));
        let monitor = monitor(readings);

        for _ in 0..21 {
            monitor.record_current().await;
        }

        let result = monitor.detect_anomalies(Some(0.15));
        assert_eq!(result.status, DetectionStatus::Ok);
        assert_eq!(result.total_points, 21);
        assert_eq!(result.anomaly_count, 1);
        assert_eq!(result.anomalies[0].index, 20);
    }

    #[tokio::test]
    async fn test_detect_anomalies_insufficient_data() {
        let monitor = monitor(vec![(50.0, 60.0, 40.0)]);
        for _ in 0..9 {
            monitor.record_current().await;
        }

        let result = monitor.detect_anomalies(None);
        assert_eq!(result.status, DetectionStatus::InsufficientData);
        assert_eq!(result.total_points, 9);
    }

    #[tokio::test]
    async fn test_alerts_record_and_evaluate() {
        let monitor = monitor(vec![(93.2, 50.0, 50.0)]);

        let report = monitor.alerts().await;

        assert_eq!(report.count, 1);
        assert_eq!(report.alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(report.alerts[0].message, "CPU usage is high: 93.2%");
        assert_eq!(monitor.get_history().len(), 1);
    }

    #[tokio::test]
    async fn test_predictions_and_summary() {
        let readings = (0..10).map(|i| (i as f64 * 3.0, 50.0, 40.0)).collect();
        let monitor = monitor(readings);
        assert!(monitor.summary().is_none());

        for _ in 0..10 {
            monitor.record_current().await;
        }

        let predictions = monitor.predictions();
        assert_eq!(predictions.cpu.trend, Trend::Increasing);
        assert_eq!(predictions.memory.trend, Trend::Stable);

        let summary = monitor.summary().unwrap();
        assert_eq!(summary.samples, 10);
        assert_eq!(summary.cpu.max, 27.0);
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let monitor = monitor(vec![(1.0, 2.0, 3.0)]);
        monitor.record_current().await;

        monitor.reset();

        assert!(monitor.get_history().is_empty());
    }

    #[tokio::test]
    async fn test_degraded_sampler_reported_in_health() {
        let mut sampler = ScriptedSampler::new(vec![(1.0, 2.0, 3.0)]);
        sampler.fallbacks = vec![Fallback::Disk, Fallback::Network];
        let monitor = Monitor::builder(Arc::new(sampler)).build();
        monitor.register_components().await;

        monitor.record_current().await;

        let health = monitor.health_registry().health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[components::SAMPLER].message.as_deref(),
            Some("zeroed fields: disk, network")
        );
    }
}
