//! Anomaly detection for host resource usage
//!
//! This module provides:
//! - Isolation-forest outlier scoring over the metric history
//! - Threshold alerts on the latest sample

mod alerter;
mod isolation_forest;
mod outlier;

pub use alerter::{Alert, AlertReport, AlertSeverity, AlertThresholds, Alerter};
pub use isolation_forest::{
    average_path_length, percentile, FeatureRow, IsolationForest, OutlierModel, OutlierScores,
    DEFAULT_MAX_SAMPLES, DEFAULT_N_ESTIMATORS, FEATURE_COUNT,
};
pub use outlier::{
    extract_features, is_valid_contamination, Anomaly, AnomalyResult, DetectionStatus,
    OutlierDetector, DEFAULT_CONTAMINATION, MAX_CONTAMINATION, MIN_DETECTION_POINTS, MODEL_SEED,
};
