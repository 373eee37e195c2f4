//! Run configuration for a bulk load
//!
//! One YAML file describes the whole run: target schema/table, declared
//! column types, primary key, input files, and the remote endpoint. All
//! tunables (statement size limit, dispatch fan-out, retry policy) live
//! here explicitly rather than as process-wide constants.

use crate::extract::ColumnSchema;
use bulkload_common::{LoadError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Configuration Defaults
// ============================================================================

/// Maximum statement size accepted by the remote endpoint, in bytes.
/// Batches are flushed at half this size to leave headroom for encoding.
pub const DEFAULT_MAX_STATEMENT_BYTES: usize = 65536;

/// Default cap on simultaneously in-flight dispatch calls.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Default maximum dispatch attempts per statement.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 7;

/// Default base backoff delay in milliseconds (doubles each attempt).
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;

fn default_max_statement_bytes() -> usize {
    DEFAULT_MAX_STATEMENT_BYTES
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_retry_base_delay_ms() -> u64 {
    DEFAULT_RETRY_BASE_DELAY_MS
}

/// Configuration for one bulk-load run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Target schema (database) name
    pub schema_name: String,

    /// Target table name
    pub table_name: String,

    /// Declared column types, in column order (e.g. "INTEGER", "DOUBLE",
    /// "BOOL", "VARCHAR(64)")
    pub column_types: Vec<String>,

    /// Column names, in column order. When absent, names come from each
    /// file's header record.
    #[serde(default)]
    pub column_names: Option<Vec<String>>,

    /// Primary-key column name(s), rendered verbatim into the CREATE TABLE
    /// statement (e.g. "id" or "id, region")
    pub primary_key: String,

    /// Input file paths
    pub file_paths: Vec<String>,

    /// Statement-execution endpoint URL
    pub endpoint_url: String,

    /// Resource identifier passed with every execute call
    pub resource_arn: String,

    /// Credential identifier passed with every execute call
    pub secret_arn: String,

    /// Maximum statement size the endpoint accepts, in bytes
    #[serde(default = "default_max_statement_bytes")]
    pub max_statement_bytes: usize,

    /// Maximum simultaneously in-flight dispatch calls
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Maximum dispatch attempts per statement
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base backoff delay in milliseconds, doubled each attempt
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Worker count for the parallel phases. Defaults to the available
    /// parallelism of the host.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl LoadConfig {
    /// Load configuration from a YAML file, apply environment overrides,
    /// and validate
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let mut config: LoadConfig = serde_yaml::from_str(&contents)?;
        config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-variable overrides for the remote identifiers
    ///
    /// - `BULKLOAD_ENDPOINT_URL`
    /// - `BULKLOAD_RESOURCE_ARN`
    /// - `BULKLOAD_SECRET_ARN`
    pub fn merge_env(&mut self) {
        if let Ok(url) = std::env::var("BULKLOAD_ENDPOINT_URL") {
            self.endpoint_url = url;
        }
        if let Ok(arn) = std::env::var("BULKLOAD_RESOURCE_ARN") {
            self.resource_arn = arn;
        }
        if let Ok(arn) = std::env::var("BULKLOAD_SECRET_ARN") {
            self.secret_arn = arn;
        }
    }

    /// Validate the configuration, failing before any work starts
    pub fn validate(&self) -> Result<()> {
        if self.file_paths.is_empty() {
            return Err(LoadError::config("file_paths must not be empty"));
        }
        if self.column_types.is_empty() {
            return Err(LoadError::config("column_types must not be empty"));
        }
        if let Some(ref names) = self.column_names {
            if names.len() != self.column_types.len() {
                return Err(LoadError::config(format!(
                    "column_names has {} entries but column_types has {}",
                    names.len(),
                    self.column_types.len()
                )));
            }
        }
        if self.primary_key.trim().is_empty() {
            return Err(LoadError::config("primary_key must not be empty"));
        }
        if self.max_statement_bytes == 0 {
            return Err(LoadError::config("max_statement_bytes must be positive"));
        }
        if self.max_in_flight == 0 {
            return Err(LoadError::config("max_in_flight must be positive"));
        }
        if self.retry_attempts == 0 {
            return Err(LoadError::config("retry_attempts must be positive"));
        }
        if self.workers == Some(0) {
            return Err(LoadError::config("workers must be positive"));
        }
        Ok(())
    }

    /// Byte threshold at which a statement batch is flushed: half the
    /// endpoint maximum, leaving headroom for escaping overhead
    pub fn statement_size_threshold(&self) -> usize {
        self.max_statement_bytes / 2
    }

    /// Build the typed column schema shared by every input file
    pub fn column_schema(&self) -> Result<ColumnSchema> {
        ColumnSchema::new(self.column_names.clone(), self.column_types.clone())
    }
}
