//! Bulkload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the bulkload workspace.
//!
//! - **Error Handling**: the [`LoadError`] taxonomy and the classified
//!   [`error::RemoteError`] used by the dispatch retry policy
//! - **Logging**: tracing subscriber setup shared by all binaries

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{LoadError, RemoteError, RemoteErrorKind, Result};
