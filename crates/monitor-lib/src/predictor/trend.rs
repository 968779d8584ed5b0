//! Short-horizon trend prediction
//!
//! Compares the mean of the newest five samples with the mean of the oldest
//! five within the last ten, and extrapolates one step ahead.

use serde::{Deserialize, Serialize};

use crate::models::{MetricKind, MetricSample};

/// Minimum number of samples required for a trend
pub const MIN_TREND_SAMPLES: usize = 5;

/// Number of most recent samples considered
const TREND_WINDOW: usize = 10;

/// Samples averaged at each end of the window
const SEGMENT_LEN: usize = 5;

/// Change in percentage points beyond which a trend is reported
const TREND_SENSITIVITY: f64 = 5.0;

/// Direction of recent change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Stable,
    Increasing,
    Decreasing,
}

/// Trend and one-step forecast for a single resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPrediction {
    pub trend: Trend,
    /// Mean of the newest samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    /// Forecast clamped to `[0, 100]`, `None` without enough history
    pub predicted: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
}

impl TrendPrediction {
    fn insufficient() -> Self {
        Self {
            trend: Trend::Stable,
            current: None,
            predicted: None,
            change: None,
        }
    }
}

/// Predictions for every tracked resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub cpu: TrendPrediction,
    pub memory: TrendPrediction,
    pub disk: TrendPrediction,
}

impl Predictions {
    pub fn from_history(history: &[MetricSample]) -> Self {
        Self {
            cpu: predict_trend(history, MetricKind::Cpu),
            memory: predict_trend(history, MetricKind::Memory),
            disk: predict_trend(history, MetricKind::Disk),
        }
    }
}

/// Predict the trend of one resource from the history
pub fn predict_trend(history: &[MetricSample], kind: MetricKind) -> TrendPrediction {
    if history.len() < MIN_TREND_SAMPLES {
        return TrendPrediction::insufficient();
    }

    let window = &history[history.len().saturating_sub(TREND_WINDOW)..];
    let values: Vec<f64> = window.iter().map(|s| s.value_of(kind)).collect();

    // Windows shorter than ten overlap, matching the segment definitions
    let recent = mean(&values[values.len() - SEGMENT_LEN..]);
    let older = mean(&values[..SEGMENT_LEN]);
    let change = recent - older;

    let trend = if change > TREND_SENSITIVITY {
        Trend::Increasing
    } else if change < -TREND_SENSITIVITY {
        Trend::Decreasing
    } else {
        Trend::Stable
    };

    TrendPrediction {
        trend,
        current: Some(recent),
        predicted: Some((recent + change).clamp(0.0, 100.0)),
        change: Some(change),
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
