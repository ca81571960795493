//! Gateway error types.
//!
//! [`IngestError`] covers everything that can end a single request and knows
//! its HTTP status. [`GatewayError`] is for the supervisor: startup and
//! listener failures that are not tied to one request.

use crate::ports::directory::DirectoryError;
use axum::http::StatusCode;
use ingest_bus::BusError;
use thiserror::Error;

/// Why a source was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedReason {
    /// No usable directory record for the token.
    UnknownClient,
    /// A record exists but its key does not match the presented token.
    KeyMismatch,
}

/// Errors from handing a message to the bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The local buffer is full; the client should retry.
    #[error("publish rejected: local queue full (capacity {capacity})")]
    Rejected {
        /// Buffer capacity.
        capacity: usize,
    },

    /// The producer is closed (shutdown in progress).
    #[error("publisher closed")]
    Closed,

    /// Flush gave up with messages still in flight.
    #[error("flush timed out with {remaining} message(s) in flight")]
    FlushTimeout {
        /// Messages without a delivery report.
        remaining: usize,
    },
}

impl From<BusError> for PublishError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::QueueFull { capacity } => PublishError::Rejected { capacity },
            BusError::Closed => PublishError::Closed,
            BusError::FlushTimeout { remaining } => PublishError::FlushTimeout { remaining },
        }
    }
}

/// Request-path errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The directory could not be reached or timed out.
    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// The source could not be authenticated.
    #[error("unauthorized: {0:?}")]
    Unauthorized(UnauthorizedReason),

    /// The body is not a well-formed document.
    #[error("malformed payload ({size} bytes)")]
    MalformedPayload {
        /// Body size in bytes.
        size: usize,
    },

    /// The bus did not accept the message.
    #[error(transparent)]
    PublishRejected(#[from] PublishError),

    /// The request deadline passed before the event could be published.
    #[error("request deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),
}

impl IngestError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::DirectoryUnavailable(_) => StatusCode::BAD_GATEWAY,
            IngestError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            IngestError::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
            IngestError::PublishRejected(_) => StatusCode::SERVICE_UNAVAILABLE,
            IngestError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<DirectoryError> for IngestError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::MalformedRecord(_) => {
                IngestError::Unauthorized(UnauthorizedReason::UnknownClient)
            }
            other => IngestError::DirectoryUnavailable(other.to_string()),
        }
    }
}

/// Gateway-level errors (startup and listeners)
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Directory unreachable at startup
    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// Listener failed while serving
    #[error("server error: {0}")]
    Serve(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<crate::domain::config::ConfigError> for GatewayError {
    fn from(err: crate::domain::config::ConfigError) -> Self {
        GatewayError::Config(err.to_string())
    }
}
