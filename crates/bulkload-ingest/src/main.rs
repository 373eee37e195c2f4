//! Bulkload - CSV bulk loader for statement-oriented database APIs

use anyhow::Result;
use bulkload_common::logging::{init_logging, LogConfig, LogLevel};
use bulkload_ingest::client::HttpStatementClient;
use bulkload_ingest::config::LoadConfig;
use bulkload_ingest::pipeline;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "bulkload")]
#[command(author, version, about = "Bulk-load delimited files into a remote table")]
struct Cli {
    /// Path to the YAML run configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the verbose flag
    let log_config = LogConfig::with_level(log_level).merge_env()?;
    init_logging(&log_config)?;

    info!(config = %cli.config.display(), "Loading run configuration");
    let config = LoadConfig::from_file(&cli.config)?;

    let client = HttpStatementClient::new(
        config.endpoint_url.clone(),
        config.resource_arn.clone(),
        config.secret_arn.clone(),
    )?;

    let report = pipeline::run(&config, &client).await?;

    info!(
        rows = report.metrics.rows_extracted,
        statements = report.metrics.statements_built,
        attempts = report.metrics.dispatch_attempts,
        "Bulk load complete"
    );
    Ok(())
}
