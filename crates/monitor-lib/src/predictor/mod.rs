//! Resource usage prediction
//!
//! Derives simple per-resource trends from the recent history.

mod trend;

pub use trend::{predict_trend, Predictions, Trend, TrendPrediction, MIN_TREND_SAMPLES};
