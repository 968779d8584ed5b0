//! API client for communicating with the System Monitor

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the System Monitor
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let mut base_url = Url::parse(base_url).context("Invalid API URL")?;
        // Relative joins must append to the base path, not replace its last segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        self.fetch(url).await
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Take and record a fresh sample
    pub async fn current_metrics(&self) -> Result<MetricSample> {
        self.get("api/metrics").await
    }

    pub async fn history(&self) -> Result<Vec<MetricSample>> {
        self.get("api/metrics/history").await
    }

    pub async fn summary(&self) -> Result<HistorySummary> {
        self.get("api/metrics/summary").await
    }

    pub async fn anomalies(&self, contamination: Option<f64>) -> Result<AnomalyResult> {
        let mut url = self.base_url.join("api/anomalies").context("Invalid path")?;
        if let Some(contamination) = contamination {
            url.query_pairs_mut()
                .append_pair("contamination", &contamination.to_string());
        }
        self.fetch(url).await
    }

    pub async fn predictions(&self) -> Result<Predictions> {
        self.get("api/predictions").await
    }

    /// Take a fresh sample and check it against the alert thresholds
    pub async fn alerts(&self) -> Result<AlertReport> {
        self.get("api/alerts").await
    }
}

// API response types

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSample {
    pub timestamp: String,
    pub cpu_percent: f64,
    pub cpu_count: u32,
    pub memory_percent: f64,
    pub memory_total: u64,
    pub memory_available: u64,
    pub memory_used: u64,
    pub disk_percent: f64,
    pub disk_total: u64,
    pub disk_used: u64,
    pub disk_free: u64,
    pub network: NetworkCounters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSummary {
    pub current: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// Summary of the server's history; every field is absent while it is empty
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistorySummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<MetricSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MetricSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<MetricSummary>,
    #[serde(default)]
    pub samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageView {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub index: usize,
    pub timestamp: String,
    pub score: f64,
    pub metrics: UsageView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub status: String,
    #[serde(default)]
    pub anomalies: Vec<Anomaly>,
    #[serde(default)]
    pub total_points: usize,
    #[serde(default)]
    pub anomaly_count: usize,
    #[serde(default)]
    pub anomaly_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPrediction {
    pub trend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(default)]
    pub predicted: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Predictions {
    pub cpu: TrendPrediction,
    pub memory: TrendPrediction,
    pub disk: TrendPrediction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: String,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertReport {
    pub alerts: Vec<Alert>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
