//! Bounded retry around statement dispatch
//!
//! One execute call per attempt. Retryable failures back off exponentially
//! (base delay doubling, no cap) up to a fixed attempt count; the last error
//! is returned unchanged when attempts run out. Fatal failures propagate
//! immediately.

use crate::client::StatementClient;
use bulkload_common::RemoteError;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy for statement dispatch
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts before the last error is surfaced
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each subsequent attempt
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 7,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Result of a successful dispatch
#[derive(Debug, Clone, Copy)]
pub struct DispatchOutcome {
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Execute one statement with bounded, classified retry.
///
/// Retries never swallow a terminal failure: after `max_attempts` the most
/// recent error is returned to the caller unchanged.
pub async fn dispatch<C: StatementClient>(
    client: &C,
    sql: &str,
    transaction_id: Option<&str>,
    policy: &RetryPolicy,
) -> std::result::Result<DispatchOutcome, RemoteError> {
    let mut delay = policy.base_delay;
    let mut attempt = 1u32;

    loop {
        debug!(
            attempt,
            max_attempts = policy.max_attempts,
            statement_bytes = sql.len(),
            "Executing statement"
        );

        match client.execute(sql, transaction_id).await {
            Ok(()) => {
                debug!(attempt, "Statement executed");
                return Ok(DispatchOutcome { attempts: attempt });
            },
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retryable failure, backing off"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            },
            Err(e) => {
                warn!(attempt, error = %e, "Statement failed");
                return Err(e);
            },
        }
    }
}
