//! End-to-end pipeline tests against an in-memory statement client

use bulkload_common::RemoteError;
use bulkload_ingest::client::StatementClient;
use bulkload_ingest::config::LoadConfig;
use bulkload_ingest::pipeline;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Records every executed statement in submission order
#[derive(Default)]
struct RecordingClient {
    statements: Mutex<Vec<String>>,
}

impl StatementClient for RecordingClient {
    async fn execute(
        &self,
        sql: &str,
        _transaction_id: Option<&str>,
    ) -> Result<(), RemoteError> {
        self.statements.lock().unwrap().push(sql.to_string());
        Ok(())
    }
}

/// Fails every call with a retryable error `failures` times in total, then
/// succeeds
struct FlakyClient {
    failures: u32,
    calls: AtomicU32,
}

impl StatementClient for FlakyClient {
    async fn execute(
        &self,
        _sql: &str,
        _transaction_id: Option<&str>,
    ) -> Result<(), RemoteError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            Err(RemoteError::retryable("Communications link failure"))
        } else {
            Ok(())
        }
    }
}

struct FatalClient;

impl StatementClient for FatalClient {
    async fn execute(
        &self,
        _sql: &str,
        _transaction_id: Option<&str>,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::fatal("Unknown database 'db'"))
    }
}

fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

fn config_for(files: &[&NamedTempFile], max_statement_bytes: usize) -> LoadConfig {
    LoadConfig {
        schema_name: "db".to_string(),
        table_name: "t".to_string(),
        column_types: vec![
            "INTEGER".to_string(),
            "TEXT".to_string(),
            "DOUBLE".to_string(),
        ],
        column_names: None,
        primary_key: "id".to_string(),
        file_paths: files
            .iter()
            .map(|f| f.path().display().to_string())
            .collect(),
        endpoint_url: "http://unused".to_string(),
        resource_arn: "arn:resource".to_string(),
        secret_arn: "arn:secret".to_string(),
        max_statement_bytes,
        max_in_flight: 8,
        retry_attempts: 7,
        retry_base_delay_ms: 1,
        // single worker keeps batch boundaries deterministic
        workers: Some(1),
    }
}

#[tokio::test]
async fn single_statement_with_unquoted_null() {
    let file = write_csv(&["id,name,score", "1,a,2.5", "2,b,", "3,,4.0"]);
    let config = config_for(&[&file], 65536);
    let client = RecordingClient::default();

    let report = pipeline::run(&config, &client).await.unwrap();
    assert_eq!(report.metrics.rows_extracted, 3);
    assert_eq!(report.metrics.statements_built, 1);

    let statements = client.statements.lock().unwrap();
    // schema statement first, then exactly one write statement
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[0],
        "CREATE TABLE IF NOT EXISTS `db`.`t` (id INTEGER, name TEXT, score DOUBLE, PRIMARY KEY (id));"
    );
    assert_eq!(
        statements[1],
        "REPLACE INTO `db`.`t` VALUES (1,'a',2.5),(2,'b',NULL),(3,'',4);"
    );
    assert!(!statements[1].contains("'NULL'"));
}

#[tokio::test]
async fn small_threshold_splits_two_then_one() {
    let file = write_csv(&["id,name,score", "1,a,2.5", "2,b,", "3,,4.0"]);
    // threshold = 55 fits the prefix plus the first two tuples, not three
    let config = config_for(&[&file], 110);
    let client = RecordingClient::default();

    let report = pipeline::run(&config, &client).await.unwrap();
    assert_eq!(report.metrics.statements_built, 2);

    let statements = client.statements.lock().unwrap();
    assert_eq!(statements.len(), 3);
    assert_eq!(
        statements[1],
        "REPLACE INTO `db`.`t` VALUES (1,'a',2.5),(2,'b',NULL);"
    );
    assert_eq!(statements[2], "REPLACE INTO `db`.`t` VALUES (3,'',4);");
}

#[tokio::test]
async fn rows_from_multiple_files_are_all_loaded() {
    let a = write_csv(&["id,name,score", "1,a,1.0", "2,b,2.0"]);
    let b = write_csv(&["id,name,score", "3,c,3.0"]);
    let config = config_for(&[&a, &b], 65536);
    let client = RecordingClient::default();

    let report = pipeline::run(&config, &client).await.unwrap();
    assert_eq!(report.metrics.rows_extracted, 3);

    let statements = client.statements.lock().unwrap();
    let data: String = statements[1..].join(" ");
    for tuple in ["(1,'a',1)", "(2,'b',2)", "(3,'c',3)"] {
        assert!(data.contains(tuple), "missing {} in {}", tuple, data);
    }
}

#[tokio::test]
async fn transient_failures_are_retried_to_success() {
    let file = write_csv(&["id,name,score", "1,a,2.5"]);
    let config = config_for(&[&file], 65536);
    let client = FlakyClient {
        failures: 2,
        calls: AtomicU32::new(0),
    };

    let report = pipeline::run(&config, &client).await.unwrap();
    // schema + one data statement, plus two retried attempts
    assert_eq!(report.metrics.dispatch_attempts, 4);
}

#[tokio::test]
async fn fatal_remote_error_aborts_the_run() {
    let file = write_csv(&["id,name,score", "1,a,2.5"]);
    let config = config_for(&[&file], 65536);

    let err = pipeline::run(&config, &FatalClient).await.unwrap_err();
    assert!(err.to_string().contains("Unknown database"));
}

#[tokio::test]
async fn schema_mismatch_aborts_extraction() {
    let file = write_csv(&["id,name,score", "1,a,2.5,extra"]);
    let config = config_for(&[&file], 65536);
    let client = RecordingClient::default();

    let err = pipeline::run(&config, &client).await.unwrap_err();
    assert!(err.to_string().contains("Schema mismatch"));
    // nothing was dispatched
    assert!(client.statements.lock().unwrap().is_empty());
}

/// Applies REPLACE statements to an in-memory table keyed by the first
/// column, to exercise insert-or-overwrite idempotence
#[derive(Default)]
struct ReplayTableClient {
    rows: Mutex<HashMap<String, String>>,
}

impl StatementClient for ReplayTableClient {
    async fn execute(
        &self,
        sql: &str,
        _transaction_id: Option<&str>,
    ) -> Result<(), RemoteError> {
        if let Some(values) = sql.strip_prefix("REPLACE INTO `db`.`t` VALUES ") {
            let values = values.trim_end_matches(';');
            let mut rows = self.rows.lock().unwrap();
            for tuple in values.split("),(") {
                let tuple = tuple.trim_matches(|c| c == '(' || c == ')');
                let key = tuple.split(',').next().unwrap_or_default().to_string();
                rows.insert(key, tuple.to_string());
            }
        }
        Ok(())
    }
}

#[tokio::test]
async fn replaying_the_same_run_is_idempotent() {
    let file = write_csv(&["id,name,score", "1,a,2.5", "2,b,"]);
    let config = config_for(&[&file], 65536);
    let client = ReplayTableClient::default();

    pipeline::run(&config, &client).await.unwrap();
    let first = client.rows.lock().unwrap().clone();
    assert_eq!(first.len(), 2);

    pipeline::run(&config, &client).await.unwrap();
    let second = client.rows.lock().unwrap().clone();
    assert_eq!(first, second);
}
