//! Anomaly, prediction and alert commands

use anyhow::Result;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use crate::client::{ApiClient, TrendPrediction};
use crate::output::{
    color_severity, color_trend, format_percent, format_timestamp, print_heading, print_json,
    print_success, print_warning, OutputFormat,
};

/// Row for the anomalies table
#[derive(Tabled)]
struct AnomalyRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Disk")]
    disk: String,
}

/// Row for the predictions table
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Trend")]
    trend: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Predicted")]
    predicted: String,
    #[tabled(rename = "Change")]
    change: String,
}

impl PredictionRow {
    fn new(metric: &'static str, prediction: &TrendPrediction) -> Self {
        Self {
            metric,
            trend: color_trend(&prediction.trend),
            current: optional_percent(prediction.current),
            predicted: optional_percent(prediction.predicted),
            change: prediction
                .change
                .map(|c| format!("{:+.1}", c))
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Row for the alerts table
#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Threshold")]
    threshold: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Run outlier detection over the server's history
pub async fn show_anomalies(
    client: &ApiClient,
    contamination: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let result = client.anomalies(contamination).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            if result.status == "insufficient_data" {
                let message = result
                    .message
                    .as_deref()
                    .unwrap_or("Not enough data for anomaly detection");
                print_warning(&format!("{} (have {})", message, result.total_points));
                return Ok(());
            }

            print_heading("Anomaly Detection");
            println!(
                "{} of {} samples flagged ({:.1}%)",
                result.anomaly_count.to_string().bold(),
                result.total_points,
                result.anomaly_rate * 100.0
            );

            if result.anomalies.is_empty() {
                print_success("No anomalies detected");
                return Ok(());
            }

            let rows: Vec<AnomalyRow> = result
                .anomalies
                .iter()
                .map(|a| AnomalyRow {
                    index: a.index,
                    time: format_timestamp(&a.timestamp),
                    score: format!("{:.4}", a.score),
                    cpu: format_percent(a.metrics.cpu_percent),
                    memory: format_percent(a.metrics.memory_percent),
                    disk: format_percent(a.metrics.disk_percent),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()).to_string());
        }
    }

    Ok(())
}

/// Show short-horizon trend predictions
pub async fn show_predictions(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let predictions = client.predictions().await?;

    match format {
        OutputFormat::Json => print_json(&predictions)?,
        OutputFormat::Table => {
            let rows = vec![
                PredictionRow::new("CPU", &predictions.cpu),
                PredictionRow::new("Memory", &predictions.memory),
                PredictionRow::new("Disk", &predictions.disk),
            ];
            print_heading("Trend Predictions");
            println!("{}", Table::new(rows).with(Style::rounded()).to_string());
        }
    }

    Ok(())
}

/// Take a fresh sample and show any threshold alerts
pub async fn show_alerts(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report = client.alerts().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            if report.alerts.is_empty() {
                print_success("No active alerts");
                return Ok(());
            }

            let rows: Vec<AlertRow> = report
                .alerts
                .iter()
                .map(|a| AlertRow {
                    kind: a.kind.clone(),
                    severity: color_severity(&a.severity),
                    value: format_percent(a.value),
                    threshold: format_percent(a.threshold),
                    message: a.message.clone(),
                })
                .collect();
            print_heading(&format!("Active Alerts ({})", report.count));
            println!("{}", Table::new(rows).with(Style::rounded()).to_string());
        }
    }

    Ok(())
}

fn optional_percent(value: Option<f64>) -> String {
    value.map(format_percent).unwrap_or_else(|| "-".to_string())
}
