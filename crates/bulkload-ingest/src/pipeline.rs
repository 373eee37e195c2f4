//! Staged pipeline orchestration
//!
//! Three strictly sequenced phases: parallel extraction, parallel batching,
//! concurrent dispatch. The parallel phases fan CPU-bound work out over
//! blocking worker tasks with a join barrier between phases and no shared
//! mutable state; dispatch submits every prepared statement concurrently
//! over one shared client, gated by a bounded semaphore. The CREATE TABLE
//! statement always completes before the first data statement goes out.

use crate::batch::batch_rows;
use crate::client::StatementClient;
use crate::config::LoadConfig;
use crate::dispatch::{dispatch, RetryPolicy};
use crate::extract::{create_table_statement, ColumnSchema, Row, RowReader};
use crate::partition::partition;
use bulkload_common::{LoadError, RemoteError, Result};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Monotonic counters aggregated after each phase's join
#[derive(Debug, Default, Clone, Copy)]
pub struct RunMetrics {
    pub rows_extracted: u64,
    pub statements_built: u64,
    pub dispatch_attempts: u64,
}

/// Summary of a completed run
#[derive(Debug)]
pub struct RunReport {
    pub metrics: RunMetrics,
    pub elapsed: Duration,
}

/// Run the full ingestion-to-dispatch pipeline
pub async fn run<C: StatementClient>(config: &LoadConfig, client: &C) -> Result<RunReport> {
    let start = Instant::now();
    let workers = config.workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    info!(
        workers,
        files = config.file_paths.len(),
        table = %format!("{}.{}", config.schema_name, config.table_name),
        "Starting bulk load"
    );

    let schema = config.column_schema()?;

    // Phase 1: parallel extraction
    let extract_start = Instant::now();
    let file_partitions = partition(config.file_paths.clone(), workers)?;
    let mut handles = Vec::with_capacity(file_partitions.len());
    for files in file_partitions {
        let schema = schema.clone();
        let schema_name = config.schema_name.clone();
        let table_name = config.table_name.clone();
        let primary_key = config.primary_key.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            extract_partition(files, &schema, &schema_name, &table_name, &primary_key)
        }));
    }

    let mut rows: Vec<Row> = Vec::new();
    let mut create_sql: Option<String> = None;
    for handle in handles {
        let (mut partition_rows, partition_create) =
            handle.await.map_err(|e| LoadError::task(e.to_string()))??;
        rows.append(&mut partition_rows);
        if create_sql.is_none() {
            create_sql = partition_create;
        }
    }
    let rows_extracted = rows.len() as u64;
    let create_sql = create_sql
        .ok_or_else(|| LoadError::config("no input file produced a schema statement"))?;
    info!(
        rows = rows_extracted,
        elapsed = %format_elapsed(extract_start.elapsed()),
        "Extraction phase complete"
    );

    // Phase 2: parallel batching
    let batch_start = Instant::now();
    let threshold = config.statement_size_threshold();
    let row_partitions = partition(rows, workers)?;
    let mut handles = Vec::with_capacity(row_partitions.len());
    for partition_rows in row_partitions {
        let schema_name = config.schema_name.clone();
        let table_name = config.table_name.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            batch_rows(&partition_rows, &schema_name, &table_name, threshold)
        }));
    }

    let mut statements: Vec<String> = Vec::new();
    for handle in handles {
        statements.extend(handle.await.map_err(|e| LoadError::task(e.to_string()))?);
    }
    let statements_built = statements.len() as u64;
    let approx_bytes: usize = statements.iter().map(String::len).sum();
    info!(
        statements = statements_built,
        approx_bytes,
        elapsed = %format_elapsed(batch_start.elapsed()),
        "Batching phase complete"
    );

    // Phase 3: concurrent dispatch
    let dispatch_start = Instant::now();
    let policy = RetryPolicy {
        max_attempts: config.retry_attempts,
        base_delay: Duration::from_millis(config.retry_base_delay_ms),
    };

    // The target table must exist before any data statement is dispatched
    debug!("Issuing schema statement");
    let schema_outcome = dispatch(client, &create_sql, None, &policy).await?;
    let mut dispatch_attempts = u64::from(schema_outcome.attempts);

    let semaphore = Semaphore::new(config.max_in_flight);
    let outcomes = futures::future::try_join_all(statements.iter().map(|sql| {
        let semaphore = &semaphore;
        let policy = &policy;
        async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|_| RemoteError::fatal("dispatch semaphore closed"))?;
            dispatch(client, sql, None, policy).await
        }
    }))
    .await?;
    dispatch_attempts += outcomes.iter().map(|o| u64::from(o.attempts)).sum::<u64>();
    info!(
        statements = statements_built,
        attempts = dispatch_attempts,
        elapsed = %format_elapsed(dispatch_start.elapsed()),
        "Dispatch phase complete"
    );

    let elapsed = start.elapsed();
    info!(
        rows = rows_extracted,
        total_time = %format_elapsed(elapsed),
        "Completed insertion"
    );

    Ok(RunReport {
        metrics: RunMetrics {
            rows_extracted,
            statements_built,
            dispatch_attempts,
        },
        elapsed,
    })
}

/// Extract every file in one partition, returning its rows in file order
/// plus the schema statement generated from the first file
fn extract_partition(
    files: Vec<String>,
    schema: &ColumnSchema,
    schema_name: &str,
    table_name: &str,
    primary_key: &str,
) -> Result<(Vec<Row>, Option<String>)> {
    let mut rows = Vec::new();
    let mut create_sql = None;
    for file in files {
        let reader = RowReader::open(&file, schema)?;
        if create_sql.is_none() {
            create_sql = Some(create_table_statement(
                schema_name,
                table_name,
                reader.column_names(),
                schema.declared(),
                primary_key,
            ));
        }
        for row in reader {
            rows.push(row?);
        }
        debug!(file = %file, rows = rows.len(), "File extracted");
    }
    Ok((rows, create_sql))
}

/// Render a duration in seconds, minutes, or hours depending on magnitude
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs >= 3600.0 {
        format!("{:.2} hours", secs / 3600.0)
    } else if secs >= 60.0 {
        format!("{:.2} minutes", secs / 60.0)
    } else {
        format!("{:.2} seconds", secs)
    }
}
