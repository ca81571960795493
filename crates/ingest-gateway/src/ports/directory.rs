//! Source directory port.

use crate::domain::source::SourceRecord;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from the source directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The backing store could not be reached.
    #[error("directory unreachable: {0}")]
    Unavailable(String),

    /// The lookup did not finish in time.
    #[error("directory lookup timed out after {0:?}")]
    Timeout(Duration),

    /// A document was found but does not have the expected shape.
    #[error("malformed directory record: {0}")]
    MalformedRecord(String),
}

/// Read-only access to registered sources.
///
/// Implementations are shared behind an `Arc` and must be safe to call
/// from many requests at once.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Find the source registered under `token`.
    ///
    /// An empty or unknown token is `Ok(None)`.
    async fn lookup(&self, token: &str) -> Result<Option<SourceRecord>, DirectoryError>;

    /// Check the backing store is reachable.
    async fn ping(&self) -> Result<(), DirectoryError>;

    /// Release the handle. Called once during shutdown.
    async fn close(&self) {}
}
