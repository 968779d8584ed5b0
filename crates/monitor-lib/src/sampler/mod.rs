//! Host metrics sampling
//!
//! Samplers never fail: a source that cannot be read contributes zeroed
//! fields and is reported as a fallback instead.

mod system;

pub use system::{host_name, SystemSampler, DEFAULT_CPU_SAMPLE_INTERVAL};

use crate::models::MetricSample;
use serde::Serialize;

pub use async_trait::async_trait;

/// Sub-sampler that produced zeroed fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fallback {
    Cpu,
    Memory,
    Disk,
    Network,
}

impl std::fmt::Display for Fallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fallback::Cpu => write!(f, "cpu"),
            Fallback::Memory => write!(f, "memory"),
            Fallback::Disk => write!(f, "disk"),
            Fallback::Network => write!(f, "network"),
        }
    }
}

/// A fresh sample plus the sources that could not be read
#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub sample: MetricSample,
    pub fallbacks: Vec<Fallback>,
}

impl SampleOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.fallbacks.is_empty()
    }

    /// Comma-separated fallback names, e.g. `"disk, network"`
    pub fn describe_fallbacks(&self) -> String {
        self.fallbacks
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Trait for host metrics sampling implementations
#[async_trait]
pub trait MetricsSampler: Send + Sync {
    /// Take one sample of current resource usage
    async fn sample(&self) -> SampleOutcome;
}
