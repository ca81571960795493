//! HTTP mapping for ingest outcomes.

use crate::domain::error::{IngestError, PublishError, UnauthorizedReason};
use crate::ingest::handler::IngestOutcome;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Seconds a client should wait after a 503.
pub const RETRY_AFTER_SECS: u64 = 1;

/// `{"error": true, "message": ...}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: bool,
    pub message: &'static str,
}

impl ErrorBody {
    pub fn new(message: &'static str) -> Self {
        Self {
            error: true,
            message,
        }
    }
}

impl IntoResponse for IngestOutcome {
    fn into_response(self) -> Response {
        match self {
            IngestOutcome::Accepted { body, .. } => (
                StatusCode::CREATED,
                [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                body,
            )
                .into_response(),
            IngestOutcome::Rejected { error, body } => error_response(error, body),
        }
    }
}

fn error_response(error: IngestError, body: bytes::Bytes) -> Response {
    let status = error.status_code();
    match error {
        IngestError::DirectoryUnavailable(_) => {
            (status, Json(ErrorBody::new("Directory Unavailable"))).into_response()
        }
        IngestError::Unauthorized(UnauthorizedReason::UnknownClient) => {
            (status, Json(ErrorBody::new("Unknown Client"))).into_response()
        }
        // Echo the body so the sender can see what was refused.
        IngestError::Unauthorized(UnauthorizedReason::KeyMismatch)
        | IngestError::MalformedPayload { .. } => (status, body).into_response(),
        IngestError::DeadlineExceeded(_) => {
            (status, Json(ErrorBody::new("Request Timeout"))).into_response()
        }
        IngestError::PublishRejected(err) => {
            let message = match err {
                PublishError::Rejected { .. } => "Event Queue Full",
                PublishError::Closed | PublishError::FlushTimeout { .. } => "Service Shutting Down",
            };
            (
                status,
                [(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS))],
                Json(ErrorBody::new(message)),
            )
                .into_response()
        }
    }
}
