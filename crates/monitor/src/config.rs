//! Monitor configuration

use anyhow::{Context, Result};
use monitor_lib::anomaly::{is_valid_contamination, AlertThresholds, DEFAULT_CONTAMINATION};
use monitor_lib::history::DEFAULT_HISTORY_SIZE;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::warn;

/// Upper bound for the history store capacity
pub const MAX_HISTORY_SIZE: usize = 100_000;

/// Monitor configuration, read once from the environment at startup
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP listen address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Dashboard refresh interval in seconds
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval: u64,

    /// History store capacity
    #[serde(default = "default_history_size")]
    pub metrics_history_size: usize,

    /// Expected fraction of outliers when a request does not specify one
    #[serde(default = "default_contamination")]
    pub anomaly_contamination: f64,

    /// CPU measurement window in milliseconds
    #[serde(default = "default_cpu_sample_interval_ms")]
    pub cpu_sample_interval_ms: u64,

    #[serde(default = "default_cpu_alert_threshold")]
    pub cpu_alert_threshold: f64,

    #[serde(default = "default_memory_alert_threshold")]
    pub memory_alert_threshold: f64,

    #[serde(default = "default_disk_alert_threshold")]
    pub disk_alert_threshold: f64,
}

fn default_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_metrics_interval() -> u64 {
    5
}

fn default_history_size() -> usize {
    DEFAULT_HISTORY_SIZE
}

fn default_contamination() -> f64 {
    DEFAULT_CONTAMINATION
}

fn default_cpu_sample_interval_ms() -> u64 {
    100
}

fn default_cpu_alert_threshold() -> f64 {
    AlertThresholds::default().cpu
}

fn default_memory_alert_threshold() -> f64 {
    AlertThresholds::default().memory
}

fn default_disk_alert_threshold() -> f64 {
    AlertThresholds::default().disk
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            metrics_interval: default_metrics_interval(),
            metrics_history_size: default_history_size(),
            anomaly_contamination: default_contamination(),
            cpu_sample_interval_ms: default_cpu_sample_interval_ms(),
            cpu_alert_threshold: default_cpu_alert_threshold(),
            memory_alert_threshold: default_memory_alert_threshold(),
            disk_alert_threshold: default_disk_alert_threshold(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from unprefixed environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Ok(Self::from_config(config))
    }

    /// Deserialize, falling back to defaults for anything unusable
    ///
    /// An unparseable value only resets its own key.
    pub fn from_config(config: config::Config) -> Self {
        let loaded = config
            .clone()
            .try_deserialize::<MonitorConfig>()
            .unwrap_or_else(|_| Self::field_by_field(&config));
        loaded.validated()
    }

    fn field_by_field(config: &config::Config) -> Self {
        let defaults = MonitorConfig::default();
        Self {
            port: field(config, "port", defaults.port),
            bind_address: field(config, "bind_address", defaults.bind_address),
            metrics_interval: field(config, "metrics_interval", defaults.metrics_interval),
            metrics_history_size: field(
                config,
                "metrics_history_size",
                defaults.metrics_history_size,
            ),
            anomaly_contamination: field(
                config,
                "anomaly_contamination",
                defaults.anomaly_contamination,
            ),
            cpu_sample_interval_ms: field(
                config,
                "cpu_sample_interval_ms",
                defaults.cpu_sample_interval_ms,
            ),
            cpu_alert_threshold: field(config, "cpu_alert_threshold", defaults.cpu_alert_threshold),
            memory_alert_threshold: field(
                config,
                "memory_alert_threshold",
                defaults.memory_alert_threshold,
            ),
            disk_alert_threshold: field(
                config,
                "disk_alert_threshold",
                defaults.disk_alert_threshold,
            ),
        }
    }

    fn validated(mut self) -> Self {
        if !is_valid_contamination(self.anomaly_contamination) {
            warn!(
                anomaly_contamination = self.anomaly_contamination,
                "Contamination out of range, using default"
            );
            self.anomaly_contamination = DEFAULT_CONTAMINATION;
        }
        if self.metrics_history_size == 0 {
            warn!("History size must be at least 1");
            self.metrics_history_size = 1;
        }
        if self.metrics_history_size > MAX_HISTORY_SIZE {
            warn!(
                metrics_history_size = self.metrics_history_size,
                max = MAX_HISTORY_SIZE,
                "History size too large, clamping"
            );
            self.metrics_history_size = MAX_HISTORY_SIZE;
        }
        if self.metrics_interval == 0 {
            self.metrics_interval = 1;
        }
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .with_context(|| format!("invalid BIND_ADDRESS '{}'", self.bind_address))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn cpu_sample_interval(&self) -> Duration {
        Duration::from_millis(self.cpu_sample_interval_ms)
    }

    pub fn alert_thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            cpu: self.cpu_alert_threshold,
            memory: self.memory_alert_threshold,
            disk: self.disk_alert_threshold,
        }
    }
}

fn field<T: DeserializeOwned>(config: &config::Config, key: &str, default: T) -> T {
    match config.get::<T>(key) {
        Ok(value) => value,
        Err(config::ConfigError::NotFound(_)) => default,
        Err(e) => {
            warn!(key, error = %e, "Invalid configuration value, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(overrides: &[(&str, &str)]) -> MonitorConfig {
        let mut builder = config::Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        MonitorConfig::from_config(builder.build().unwrap())
    }

    #[test]
    fn test_defaults() {
        let config = build(&[]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.metrics_interval, 5);
        assert_eq!(config.metrics_history_size, 100);
        assert_eq!(config.anomaly_contamination, 0.1);
        assert_eq!(config.cpu_sample_interval(), Duration::from_millis(100));
        assert_eq!(config.alert_thresholds(), AlertThresholds::default());
    }

    #[test]
    fn test_overrides() {
        let config = build(&[
            ("port", "9090"),
            ("metrics_history_size", "25"),
            ("cpu_alert_threshold", "70.5"),
        ]);

        assert_eq!(config.port, 9090);
        assert_eq!(config.metrics_history_size, 25);
        assert_eq!(config.alert_thresholds().cpu, 70.5);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = build(&[("anomaly_contamination", "0.9"), ("metrics_history_size", "0")]);

        assert_eq!(config.anomaly_contamination, DEFAULT_CONTAMINATION);
        assert_eq!(config.metrics_history_size, 1);
    }

    #[test]
    fn test_unparseable_value_only_resets_its_key() {
        let config = build(&[
            ("port", "not-a-port"),
            ("metrics_history_size", "25"),
            ("cpu_alert_threshold", "70.5"),
        ]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.metrics_history_size, 25);
        assert_eq!(config.alert_thresholds().cpu, 70.5);
    }

    #[test]
    fn test_oversized_history_is_clamped() {
        let config = build(&[("metrics_history_size", "1000000")]);

        assert_eq!(config.metrics_history_size, MAX_HISTORY_SIZE);
    }

    #[test]
    fn test_socket_addr() {
        let config = build(&[("bind_address", "127.0.0.1"), ("port", "3000")]);
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:3000");

        let bad = build(&[("bind_address", "not an ip")]);
        assert!(bad.socket_addr().is_err());
    }
}
