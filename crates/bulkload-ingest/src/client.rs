//! Remote statement-execution client
//!
//! The pipeline consumes the endpoint through the narrow [`StatementClient`]
//! contract: submit complete SQL text, get back either success or a
//! [`RemoteError`] already classified into the closed retryable/fatal kind
//! set. All message inspection happens here; the retry policy never sees
//! free-form text.

use bulkload_common::RemoteError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Client Constants
// ============================================================================

/// Default timeout for execute calls in seconds.
/// Can be overridden via BULKLOAD_API_TIMEOUT_SECS.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 300;

/// Message fragment the managed proxy returns while a cold-started endpoint
/// is still establishing its connection link
const COLD_START_MESSAGE: &str = "Communications link failure";

/// Message fragment for a deadlock between concurrent REPLACE statements
const DEADLOCK_MESSAGE: &str = "Deadlock found when trying to get lock";

/// Message fragment for a lock-wait timeout
const LOCK_WAIT_MESSAGE: &str = "Lock wait timeout exceeded";

/// Narrow contract for the statement-oriented remote API: one stateless
/// execute call per statement, failures pre-classified
#[allow(async_fn_in_trait)]
pub trait StatementClient {
    /// Execute one complete SQL statement, optionally inside an explicit
    /// transaction
    async fn execute(
        &self,
        sql: &str,
        transaction_id: Option<&str>,
    ) -> std::result::Result<(), RemoteError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest<'a> {
    sql: &'a str,
    resource_arn: &'a str,
    secret_arn: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// HTTP implementation of [`StatementClient`].
///
/// Posts (sql, resource identifier, credential identifier, optional
/// transaction id) as JSON to a stateless execute endpoint. The endpoint
/// must tolerate concurrent outstanding calls on one client handle.
pub struct HttpStatementClient {
    client: reqwest::Client,
    endpoint_url: String,
    resource_arn: String,
    secret_arn: String,
}

impl HttpStatementClient {
    /// Create a client for the given endpoint and identifiers
    pub fn new(
        endpoint_url: impl Into<String>,
        resource_arn: impl Into<String>,
        secret_arn: impl Into<String>,
    ) -> std::result::Result<Self, RemoteError> {
        let timeout_secs = std::env::var("BULKLOAD_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RemoteError::fatal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint_url: endpoint_url.into(),
            resource_arn: resource_arn.into(),
            secret_arn: secret_arn.into(),
        })
    }

    /// Classify a non-success response into the closed error-kind set.
    ///
    /// Only bad-request-class responses whose message indicates the proxy's
    /// cold-start connection-link failure or a lock/deadlock condition are
    /// retryable; everything else is fatal.
    fn classify(status: reqwest::StatusCode, body: &str) -> RemoteError {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.to_string());

        let transient = status == reqwest::StatusCode::BAD_REQUEST
            && (message.contains(COLD_START_MESSAGE)
                || message.contains(DEADLOCK_MESSAGE)
                || message.contains(LOCK_WAIT_MESSAGE));

        if transient {
            RemoteError::retryable(format!("{}: {}", status, message))
        } else {
            RemoteError::fatal(format!("{}: {}", status, message))
        }
    }
}

impl StatementClient for HttpStatementClient {
    async fn execute(
        &self,
        sql: &str,
        transaction_id: Option<&str>,
    ) -> std::result::Result<(), RemoteError> {
        let request = ExecuteRequest {
            sql,
            resource_arn: &self.resource_arn,
            secret_arn: &self.secret_arn,
            transaction_id,
        };

        let response = self
            .client
            .post(&self.endpoint_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteError::fatal(format!("transport failure: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::classify(status, &body))
    }
}
