//! Host sampler backed by sysinfo
//!
//! Reads:
//! - global CPU usage over a short measurement window
//! - physical memory usage
//! - usage of the filesystem mounted at `/`
//! - network counters summed over every interface

use super::{Fallback, MetricsSampler, SampleOutcome};
use crate::models::{MetricSample, NetworkCounters};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;
use sysinfo::{Disks, Networks, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tokio::sync::Mutex;
use tracing::debug;

/// Default CPU measurement window
pub const DEFAULT_CPU_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Hostname reported by the OS, if any
pub fn host_name() -> Option<String> {
    System::host_name()
}

struct SamplerState {
    system: System,
    last_timestamp: Option<DateTime<Utc>>,
}

/// Samples the local host
pub struct SystemSampler {
    state: Mutex<SamplerState>,
    cpu_interval: Duration,
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new(DEFAULT_CPU_SAMPLE_INTERVAL)
    }
}

impl SystemSampler {
    /// Create a sampler measuring CPU usage over `cpu_interval`
    ///
    /// The window never drops below sysinfo's minimum refresh interval.
    pub fn new(cpu_interval: Duration) -> Self {
        Self {
            state: Mutex::new(SamplerState {
                system: System::new(),
                last_timestamp: None,
            }),
            cpu_interval: cpu_interval.max(MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }

    pub fn cpu_interval(&self) -> Duration {
        self.cpu_interval
    }
}

#[async_trait]
impl MetricsSampler for SystemSampler {
    async fn sample(&self) -> SampleOutcome {
        let mut state = self.state.lock().await;
        let mut fallbacks = Vec::new();

        // CPU usage is the delta between two refreshes
        state.system.refresh_cpu();
        tokio::time::sleep(self.cpu_interval).await;
        state.system.refresh_cpu();
        state.system.refresh_memory();

        let system = &state.system;
        let cpu_count = system.cpus().len() as u32;
        if cpu_count == 0 {
            fallbacks.push(Fallback::Cpu);
        }
        let cpu_percent = clamp_percent(system.global_cpu_info().cpu_usage() as f64);

        let memory_total = system.total_memory();
        let memory_available = system.available_memory().min(memory_total);
        if memory_total == 0 {
            fallbacks.push(Fallback::Memory);
        }

        let disk = read_root_disk();
        if disk.is_none() {
            fallbacks.push(Fallback::Disk);
        }
        let (disk_total, disk_free) = disk.unwrap_or((0, 0));
        let disk_used = disk_total.saturating_sub(disk_free);

        let network = read_network();
        if network.is_none() {
            fallbacks.push(Fallback::Network);
        }

        // Wall clock may step backwards; keep timestamps non-decreasing
        let now = Utc::now();
        let timestamp = state.last_timestamp.map_or(now, |last| last.max(now));
        state.last_timestamp = Some(timestamp);

        let sample = MetricSample {
            timestamp,
            cpu_percent,
            cpu_count: cpu_count.max(1),
            memory_percent: percent_of(memory_total - memory_available, memory_total),
            memory_total,
            memory_available,
            memory_used: state.system.used_memory(),
            disk_percent: percent_of(disk_used, disk_total),
            disk_total,
            disk_used,
            disk_free,
            network: network.unwrap_or_default(),
        };

        debug!(
            cpu_percent = sample.cpu_percent,
            memory_percent = sample.memory_percent,
            disk_percent = sample.disk_percent,
            fallbacks = fallbacks.len(),
            "Host sampled"
        );

        SampleOutcome { sample, fallbacks }
    }
}

/// `(total, available)` bytes of the root filesystem, else the first disk
fn read_root_disk() -> Option<(u64, u64)> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| disks.list().first())
        .map(|d| (d.total_space(), d.available_space().min(d.total_space())))
}

fn read_network() -> Option<NetworkCounters> {
    let networks = Networks::new_with_refreshed_list();
    let mut interfaces = networks.iter().peekable();
    interfaces.peek()?;

    Some(
        interfaces.fold(NetworkCounters::default(), |acc, (_, data)| NetworkCounters {
            bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
            bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
            packets_sent: acc
                .packets_sent
                .saturating_add(data.total_packets_transmitted()),
            packets_recv: acc
                .packets_recv
                .saturating_add(data.total_packets_received()),
        }),
    )
}

fn percent_of(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    clamp_percent(part as f64 / total as f64 * 100.0)
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 0), 0.0);
        assert_eq!(percent_of(50, 200), 25.0);
        assert_eq!(percent_of(300, 200), 100.0);
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(-3.0), 0.0);
        assert_eq!(clamp_percent(104.2), 100.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
        assert_eq!(clamp_percent(42.5), 42.5);
    }

    #[test]
    fn test_interval_respects_minimum() {
        let sampler = SystemSampler::new(Duration::ZERO);
        assert_eq!(sampler.cpu_interval(), MINIMUM_CPU_UPDATE_INTERVAL);
    }

    #[tokio::test]
    async fn test_sample_values_in_range() {
        let sampler = SystemSampler::default();
        let outcome = sampler.sample().await;
        let sample = outcome.sample;

        assert!((0.0..=100.0).contains(&sample.cpu_percent));
        assert!((0.0..=100.0).contains(&sample.memory_percent));
        assert!((0.0..=100.0).contains(&sample.disk_percent));
        assert!(sample.cpu_count >= 1);
        assert!(sample.disk_used <= sample.disk_total);
    }

    #[tokio::test]
    async fn test_timestamps_never_decrease() {
        let sampler = SystemSampler::default();
        let first = sampler.sample().await.sample;
        let second = sampler.sample().await.sample;

        assert!(second.timestamp >= first.timestamp);
    }
}
