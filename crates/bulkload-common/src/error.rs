//! Error types shared across the bulkload workspace

use thiserror::Error;

/// Result type alias for bulkload operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Classification of a remote statement-execution failure.
///
/// The remote client maps transport- and service-level failures into this
/// closed set before the retry policy ever sees them; retry decisions never
/// inspect message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Transient condition (cold-start connection-link failure, lock wait /
    /// deadlock). Safe to retry with backoff.
    Retryable,
    /// Anything else. Propagated immediately, never retried.
    Fatal,
}

/// A classified failure from the remote statement-execution endpoint
#[derive(Error, Debug, Clone)]
#[error("remote execution failed ({kind:?}): {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Retryable,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Fatal,
            message: message.into(),
        }
    }

    /// Whether the retry policy may attempt this statement again
    pub fn is_retryable(&self) -> bool {
        self.kind == RemoteErrorKind::Retryable
    }
}

/// Main error type for the bulk-load pipeline
#[derive(Error, Debug)]
pub enum LoadError {
    /// Invalid or missing run configuration. Aborts before any work starts.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A record's field count disagrees with the declared column-type list
    #[error("Schema mismatch in '{file}' at record {record}: expected {expected} fields, got {actual}")]
    SchemaMismatch {
        file: String,
        record: u64,
        expected: usize,
        actual: usize,
    },

    /// A field value could not be coerced to its column's declared type
    #[error("Cannot coerce '{value}' to {column_type} for column '{column}' in '{file}' at record {record}")]
    Coercion {
        file: String,
        record: u64,
        column: String,
        column_type: String,
        value: String,
    },

    /// Remote statement execution failed (after retries, if retryable)
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// A worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Task(String),
}

impl LoadError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a worker task error
    pub fn task(msg: impl Into<String>) -> Self {
        Self::Task(msg.into())
    }
}
