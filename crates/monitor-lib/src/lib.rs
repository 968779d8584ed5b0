//! Host resource monitoring library
//!
//! This crate provides the core functionality for:
//! - Sampling CPU, memory, disk and network usage
//! - A bounded in-memory metric history
//! - Isolation-forest outlier detection and threshold alerts
//! - Trend prediction and summary statistics
//! - The HTTP API, health checks and observability

pub mod anomaly;
pub mod api;
pub mod health;
pub mod history;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod predictor;
pub mod sampler;
pub mod summary;

pub use health::{ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse};
pub use history::{HistoryStats, HistoryStore};
pub use models::*;
pub use monitor::{Monitor, MonitorBuilder};
pub use observability::{MonitorMetrics, StructuredLogger};
