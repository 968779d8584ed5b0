//! System Monitor CLI
//!
//! A command-line tool for querying a running System Monitor: current
//! usage, history, anomalies, trend predictions and threshold alerts.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{analysis, metrics};

/// System Monitor CLI
#[derive(Parser)]
#[command(name = "sysmon")]
#[command(author, version, about = "CLI for the System Monitor", long_about = None)]
pub struct Cli {
    /// Monitor URL (can also be set via SYSMON_API_URL env var)
    #[arg(long, global = true, env = "SYSMON_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Take and show a fresh sample (also recorded in history)
    Status,

    /// Show recorded samples
    History {
        /// Show only the newest N samples
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Show current, average, min and max per metric
    Summary,

    /// Detect outlier samples in the history
    Anomalies {
        /// Expected fraction of outliers, in (0, 0.5]
        #[arg(long, short)]
        contamination: Option<f64>,
    },

    /// Show trend predictions per metric
    Predictions,

    /// Take a fresh sample and show threshold alerts
    Alerts,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Status => metrics::show_status(&client, cli.format).await?,
        Commands::History { limit } => metrics::show_history(&client, limit, cli.format).await?,
        Commands::Summary => metrics::show_summary(&client, cli.format).await?,
        Commands::Anomalies { contamination } => {
            analysis::show_anomalies(&client, contamination, cli.format).await?
        }
        Commands::Predictions => analysis::show_predictions(&client, cli.format).await?,
        Commands::Alerts => analysis::show_alerts(&client, cli.format).await?,
    }

    Ok(())
}
