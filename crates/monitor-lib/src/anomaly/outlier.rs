//! Outlier detection over the metric history
//!
//! Builds a `[cpu, memory, disk]` feature matrix from a history snapshot,
//! fits a fresh model on it and reports the rows flagged as outliers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::isolation_forest::{FeatureRow, IsolationForest, OutlierModel};
use crate::models::{MetricSample, UsageView};

/// Minimum history length required for detection
pub const MIN_DETECTION_POINTS: usize = 10;

/// Default expected fraction of outliers
pub const DEFAULT_CONTAMINATION: f64 = 0.1;

/// Largest contamination the model accepts
pub const MAX_CONTAMINATION: f64 = 0.5;

/// Fixed seed so identical input always yields identical output
pub const MODEL_SEED: u64 = 42;

const INSUFFICIENT_DATA_MESSAGE: &str = "Need at least 10 data points for anomaly detection";

/// Outcome of a detection pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    InsufficientData,
    Ok,
}

/// A history row flagged as an outlier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Position in the analyzed snapshot
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    /// Model score, negative for outliers
    pub score: f64,
    pub metrics: UsageView,
}

/// Result of one detection pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub status: DetectionStatus,
    pub anomalies: Vec<Anomaly>,
    pub total_points: usize,
    pub anomaly_count: usize,
    pub anomaly_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AnomalyResult {
    fn insufficient(total_points: usize) -> Self {
        Self {
            status: DetectionStatus::InsufficientData,
            anomalies: Vec::new(),
            total_points,
            anomaly_count: 0,
            anomaly_rate: 0.0,
            message: Some(INSUFFICIENT_DATA_MESSAGE.to_string()),
        }
    }

    fn ok(total_points: usize, anomalies: Vec<Anomaly>) -> Self {
        let anomaly_count = anomalies.len();
        let anomaly_rate = if total_points == 0 {
            0.0
        } else {
            anomaly_count as f64 / total_points as f64
        };
        Self {
            status: DetectionStatus::Ok,
            anomalies,
            total_points,
            anomaly_count,
            anomaly_rate,
            message: None,
        }
    }
}

/// Returns true if `contamination` is in `(0, 0.5]`
pub fn is_valid_contamination(contamination: f64) -> bool {
    contamination > 0.0 && contamination <= MAX_CONTAMINATION
}

fn sanitize_contamination(contamination: f64) -> f64 {
    if contamination.is_nan() {
        DEFAULT_CONTAMINATION
    } else {
        contamination.clamp(f64::MIN_POSITIVE, MAX_CONTAMINATION)
    }
}

/// Build the feature matrix, one `[cpu, memory, disk]` row per sample
pub fn extract_features(history: &[MetricSample]) -> Vec<FeatureRow> {
    history
        .iter()
        .map(|s| [s.cpu_percent, s.memory_percent, s.disk_percent])
        .collect()
}

/// Flags statistically unusual samples in a history snapshot
#[derive(Debug, Clone)]
pub struct OutlierDetector<M = IsolationForest> {
    model: M,
    contamination: f64,
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CONTAMINATION)
    }
}

impl OutlierDetector {
    /// Detector backed by the default isolation forest
    pub fn new(contamination: f64) -> Self {
        Self::with_model(IsolationForest::default(), contamination)
    }
}

impl<M: OutlierModel> OutlierDetector<M> {
    pub fn with_model(model: M, contamination: f64) -> Self {
        Self {
            model,
            contamination: sanitize_contamination(contamination),
        }
    }

    /// Contamination used when the caller does not supply one
    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    /// Detect with the configured contamination
    pub fn detect(&self, history: &[MetricSample]) -> AnomalyResult {
        self.detect_with(history, self.contamination)
    }

    /// Detect with an explicit contamination, clamped to `(0, 0.5]`
    pub fn detect_with(&self, history: &[MetricSample], contamination: f64) -> AnomalyResult {
        if history.len() < MIN_DETECTION_POINTS {
            return AnomalyResult::insufficient(history.len());
        }

        let features = extract_features(history);
        let output = self.model.fit_score(
            &features,
            sanitize_contamination(contamination),
            MODEL_SEED,
        );

        let anomalies = output
            .outlier_indices()
            .map(|index| Anomaly {
                index,
                timestamp: history[index].timestamp,
                score: output.scores[index],
                metrics: history[index].usage(),
            })
            .collect();

        AnomalyResult::ok(history.len(), anomalies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::OutlierScores;
    use chrono::TimeZone;

    fn sample(i: usize, cpu: f64, memory: f64, disk: f64) -> MetricSample {
        MetricSample {
            timestamp: Utc.timestamp_opt(1_770_033_600 + i as i64, 0).unwrap(),
            cpu_percent: cpu,
            memory_percent: memory,
            disk_percent: disk,
            ..Default::default()
        }
    }

    fn varied_history(n: usize) -> Vec<MetricSample> {
        (0..n)
            .map(|i| {
                sample(
                    i,
                    50.0 + (i % 5) as f64,
                    60.0 + (i % 3) as f64,
                    40.0 + (i % 2) as f64,
                )
            })
            .collect()
    }

    /// Model that flags every row, to observe how the detector shapes output
    struct FlagEverything;

    impl OutlierModel for FlagEverything {
        fn fit_score(&self, features: &[FeatureRow], _: f64, _: u64) -> OutlierScores {
            OutlierScores {
                labels: vec![true; features.len()],
                scores: features.iter().map(|row| -row[0]).collect(),
            }
        }
    }

    #[test]
    fn test_empty_history_is_insufficient() {
        let result = OutlierDetector::default().detect(&[]);

        assert_eq!(result.status, DetectionStatus::InsufficientData);
        assert!(result.anomalies.is_empty());
        assert_eq!(result.anomaly_rate, 0.0);
        assert!(result.message.unwrap().contains("Need at least 10 data points"));
    }

    #[test]
    fn test_insufficient_data_boundary() {
        let detector = OutlierDetector::default();

        let result = detector.detect(&varied_history(9));
        assert_eq!(result.status, DetectionStatus::InsufficientData);

        let result = detector.detect(&varied_history(10));
        assert_eq!(result.status, DetectionStatus::Ok);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_insufficient_data_ignores_contamination() {
        let detector = OutlierDetector::default();
        for contamination in [0.01, 0.1, 0.5, 3.0] {
            let result = detector.detect_with(&varied_history(5), contamination);
            assert_eq!(result.status, DetectionStatus::InsufficientData);
            assert!(result.anomalies.is_empty());
        }
    }

    #[test]
    fn test_sufficient_data_reports_totals() {
        let result = OutlierDetector::new(0.1).detect(&varied_history(15));

        assert_eq!(result.status, DetectionStatus::Ok);
        assert_eq!(result.total_points, 15);
        assert_eq!(result.anomaly_count, result.anomalies.len());
    }

    #[test]
    fn test_feature_extraction() {
        let history = vec![sample(0, 10.0, 20.0, 30.0), sample(1, 40.0, 50.0, 60.0)];
        let features = extract_features(&history);

        assert_eq!(features.len(), 2);
        assert_eq!(features[0], [10.0, 20.0, 30.0]);
        assert_eq!(features[1], [40.0, 50.0, 60.0]);
    }

    #[test]
    fn test_feature_extraction_missing_fields() {
        let history: Vec<MetricSample> =
            serde_json::from_str(r#"[{"cpu_percent": 10}, {"memory_percent": 50}]"#).unwrap();
        let features = extract_features(&history);

        assert_eq!(features[0], [10.0, 0.0, 0.0]);
        assert_eq!(features[1], [0.0, 50.0, 0.0]);
    }

    #[test]
    fn test_missing_disk_percent_is_not_dropped() {
        let mut history: Vec<MetricSample> = varied_history(12);
        history.push(serde_json::from_str(r#"{"cpu_percent": 52, "memory_percent": 61}"#).unwrap());

        let result = OutlierDetector::default().detect(&history);
        assert_eq!(result.status, DetectionStatus::Ok);
        assert_eq!(result.total_points, 13);

        let result = OutlierDetector::with_model(FlagEverything, 0.1).detect(&history);
        assert_eq!(result.anomalies[12].index, 12);
        assert_eq!(result.anomalies[12].metrics.disk_percent, 0.0);
        assert_eq!(result.anomalies[12].metrics.memory_percent, 61.0);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let mut history = varied_history(30);
        history.push(sample(30, 95.0, 20.0, 80.0));
        history.push(sample(31, 5.0, 90.0, 10.0));
        let detector = OutlierDetector::default();

        let first = detector.detect_with(&history, 0.1);
        let second = detector.detect_with(&history, 0.1);

        assert_eq!(first.anomaly_count, second.anomaly_count);
        let first_indices: Vec<usize> = first.anomalies.iter().map(|a| a.index).collect();
        let second_indices: Vec<usize> = second.anomalies.iter().map(|a| a.index).collect();
        assert_eq!(first_indices, second_indices);
        for (a, b) in first.anomalies.iter().zip(&second.anomalies) {
            assert_eq!(a.score.to_bits(), b.score.to_bits());
        }
    }

    #[test]
    fn test_anomaly_rate_consistency() {
        let detector = OutlierDetector::default();

        let uniform = vec![sample(0, 50.0, 60.0, 40.0); 20];
        let result = detector.detect(&uniform);
        assert_eq!(result.anomaly_count, 0);
        assert_eq!(result.anomaly_rate, 0.0);

        let result = detector.detect(&varied_history(40));
        assert_eq!(
            result.anomaly_rate,
            result.anomaly_count as f64 / result.total_points as f64
        );
    }

    #[test]
    fn test_extreme_outlier_detected() {
        let mut history: Vec<MetricSample> =
            (0..20).map(|i| sample(i, 50.0, 60.0, 40.0)).collect();
        history.push(sample(20, 99.0, 99.0, 99.0));

        let result = OutlierDetector::new(0.15).detect(&history);

        assert_eq!(result.status, DetectionStatus::Ok);
        assert_eq!(result.total_points, 21);
        assert_eq!(result.anomaly_count, 1);
        let anomaly = &result.anomalies[0];
        assert_eq!(anomaly.index, 20);
        assert_eq!(anomaly.timestamp, history[20].timestamp);
        assert!(anomaly.score < 0.0);
        assert_eq!(anomaly.metrics.cpu_percent, 99.0);
    }

    #[test]
    fn test_anomalies_follow_snapshot_order() {
        let history = varied_history(12);
        let detector = OutlierDetector::with_model(FlagEverything, 0.1);

        let result = detector.detect(&history);
        assert_eq!(result.anomaly_count, 12);
        assert_eq!(result.anomaly_rate, 1.0);
        for (i, anomaly) in result.anomalies.iter().enumerate() {
            assert_eq!(anomaly.index, i);
            assert_eq!(anomaly.score, -history[i].cpu_percent);
            assert_eq!(anomaly.metrics, history[i].usage());
        }
    }

    #[test]
    fn test_contamination_is_clamped() {
        assert_eq!(OutlierDetector::new(0.0).contamination(), f64::MIN_POSITIVE);
        assert_eq!(OutlierDetector::new(0.9).contamination(), MAX_CONTAMINATION);
        assert_eq!(OutlierDetector::new(f64::NAN).contamination(), DEFAULT_CONTAMINATION);

        assert!(is_valid_contamination(0.5));
        assert!(!is_valid_contamination(0.0));
        assert!(!is_valid_contamination(0.51));
    }

    #[test]
    fn test_result_serialization() {
        let json = serde_json::to_value(OutlierDetector::default().detect(&[])).unwrap();
        assert_eq!(json["status"], "insufficient_data");
        assert!(json["anomalies"].as_array().unwrap().is_empty());

        let json = serde_json::to_value(OutlierDetector::default().detect(&varied_history(10)))
            .unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json.get("message").is_none());
    }
}
