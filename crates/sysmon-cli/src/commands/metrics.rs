//! Metric sampling and history commands

use anyhow::Result;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use crate::client::{ApiClient, HistorySummary, MetricSample, MetricSummary};
use crate::output::{
    color_percent, format_bytes, format_percent, format_timestamp, print_heading, print_info,
    print_json, OutputFormat,
};

/// Row for the history table
#[derive(Tabled)]
struct SampleRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Disk")]
    disk: String,
}

impl From<&MetricSample> for SampleRow {
    fn from(sample: &MetricSample) -> Self {
        Self {
            time: format_timestamp(&sample.timestamp),
            cpu: format_percent(sample.cpu_percent),
            memory: format_percent(sample.memory_percent),
            disk: format_percent(sample.disk_percent),
        }
    }
}

/// Row for the summary table
#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Average")]
    avg: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
}

impl SummaryRow {
    fn new(metric: &'static str, summary: &MetricSummary) -> Self {
        Self {
            metric,
            current: color_percent(summary.current),
            avg: format_percent(summary.avg),
            min: format_percent(summary.min),
            max: format_percent(summary.max),
        }
    }
}

/// Take a fresh sample and show it
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let sample = client.current_metrics().await?;

    match format {
        OutputFormat::Json => print_json(&sample)?,
        OutputFormat::Table => {
            print_heading("System Status");
            println!("Time:          {}", format_timestamp(&sample.timestamp).dimmed());
            println!(
                "CPU:           {} ({} cores)",
                color_percent(sample.cpu_percent),
                sample.cpu_count
            );
            println!(
                "Memory:        {} ({} of {} used)",
                color_percent(sample.memory_percent),
                format_bytes(sample.memory_used),
                format_bytes(sample.memory_total)
            );
            println!(
                "Disk:          {} ({} free of {})",
                color_percent(sample.disk_percent),
                format_bytes(sample.disk_free),
                format_bytes(sample.disk_total)
            );
            println!();

            println!("{}", "Network".bold());
            println!("{}", "-".repeat(50));
            let net = &sample.network;
            println!(
                "Sent:          {} ({} packets)",
                format_bytes(net.bytes_sent),
                net.packets_sent
            );
            println!(
                "Received:      {} ({} packets)",
                format_bytes(net.bytes_recv),
                net.packets_recv
            );
        }
    }

    Ok(())
}

/// Show the retained history, optionally only the newest `limit` samples
pub async fn show_history(
    client: &ApiClient,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let history = client.history().await?;
    let samples = newest(&history, limit);

    match format {
        OutputFormat::Json => print_json(samples)?,
        OutputFormat::Table => {
            if samples.is_empty() {
                print_info("No samples recorded yet");
                return Ok(());
            }

            let rows: Vec<SampleRow> = samples.iter().map(SampleRow::from).collect();
            println!("{}", Table::new(rows).with(Style::rounded()).to_string());
            println!(
                "Showing {} of {} samples",
                samples.len(),
                history.len()
            );
        }
    }

    Ok(())
}

/// Show per-metric statistics over the history
pub async fn show_summary(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summary = client.summary().await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            let rows = summary_rows(&summary);
            if rows.is_empty() {
                print_info("No samples recorded yet");
                return Ok(());
            }

            print_heading("History Summary");
            println!("{}", Table::new(rows).with(Style::rounded()).to_string());
            println!("Samples: {}", summary.samples);
        }
    }

    Ok(())
}

fn newest(history: &[MetricSample], limit: Option<usize>) -> &[MetricSample] {
    match limit {
        Some(limit) => &history[history.len().saturating_sub(limit)..],
        None => history,
    }
}

fn summary_rows(summary: &HistorySummary) -> Vec<SummaryRow> {
    [
        ("CPU", &summary.cpu),
        ("Memory", &summary.memory),
        ("Disk", &summary.disk),
    ]
    .into_iter()
    .filter_map(|(name, stats)| stats.as_ref().map(|s| SummaryRow::new(name, s)))
    .collect()
}
