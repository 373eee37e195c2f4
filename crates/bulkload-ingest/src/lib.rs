//! Bulkload Ingest Library
//!
//! Bulk-loads delimited text files into a relational table behind a
//! statement-oriented remote execute API.
//!
//! Pipeline stages:
//!
//! - **partition**: split file and row lists across parallel workers
//! - **extract**: stream CSV records into typed rows
//! - **batch**: accumulate rows into size-bounded REPLACE statements
//! - **dispatch**: execute statements with classified, bounded retry
//! - **pipeline**: orchestrate the staged run end to end
//!
//! # Example
//!
//! ```no_run
//! use bulkload_ingest::{client::HttpStatementClient, config::LoadConfig, pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LoadConfig::from_file("bulkload.yml")?;
//!     let client = HttpStatementClient::new(
//!         config.endpoint_url.clone(),
//!         config.resource_arn.clone(),
//!         config.secret_arn.clone(),
//!     )?;
//!     let report = pipeline::run(&config, &client).await?;
//!     println!("loaded {} rows", report.metrics.rows_extracted);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod extract;
pub mod partition;
pub mod pipeline;
