//! Ingestion handler.
//!
//! One request runs strictly in order, without retries:
//!
//! ```text
//! lookup token ──► compare key ──► validate body ──► submit
//!      │                │                │              │
//!   502 / 401          401              400         503 / 201
//! ```

use crate::domain::config::IngestConfig;
use crate::domain::error::{IngestError, UnauthorizedReason};
use crate::domain::source::SourceRecord;
use crate::ingest::credential::{self, constant_time_compare};
use crate::ingest::validation::PayloadValidator;
use crate::middleware::metrics::{IngestMetrics, RequestOutcome, RequestTimer};
use crate::middleware::timeout::RequestDeadline;
use crate::ports::directory::{DirectoryClient, DirectoryError};
use crate::publisher::EventPublisher;
use axum::extract::{Extension, Query, State};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use ingest_bus::{MessageId, OutboundMessage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of one ingest request. The body travels with it because most
/// responses echo it.
#[derive(Debug)]
pub enum IngestOutcome {
    /// Queued on the bus.
    Accepted {
        message_id: MessageId,
        body: Bytes,
    },
    /// Refused; nothing was published.
    Rejected { error: IngestError, body: Bytes },
}

impl IngestOutcome {
    /// Whether the event was queued.
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted { .. })
    }

    /// The request body as received.
    pub fn body(&self) -> &Bytes {
        match self {
            IngestOutcome::Accepted { body, .. } | IngestOutcome::Rejected { body, .. } => body,
        }
    }

    fn reject(error: IngestError, body: Bytes) -> Self {
        IngestOutcome::Rejected { error, body }
    }
}

/// Shared state for the ingest route.
pub struct IngestionHandler {
    directory: Arc<dyn DirectoryClient>,
    validator: Arc<dyn PayloadValidator>,
    publisher: Arc<EventPublisher>,
    metrics: Arc<IngestMetrics>,
    topic: String,
    auth_header: String,
    lookup_timeout: Duration,
    request_timeout: Duration,
}

impl IngestionHandler {
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        validator: Arc<dyn PayloadValidator>,
        publisher: Arc<EventPublisher>,
        metrics: Arc<IngestMetrics>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            directory,
            validator,
            publisher,
            metrics,
            topic: config.bus.topic.clone(),
            auth_header: config.bus.auth_header.clone(),
            lookup_timeout: config.timeouts.directory,
            request_timeout: config.timeouts.request,
        }
    }

    /// Run the pipeline for one request, with a deadline of `timeouts.request` from now.
    pub async fn ingest(&self, token: &str, body: Bytes) -> IngestOutcome {
        let deadline = tokio::time::Instant::now()
            .checked_add(self.request_timeout)
            .map(RequestDeadline);
        self.ingest_until(token, body, deadline).await
    }

    /// Run the pipeline for one request. Nothing is published once `deadline` has passed.
    pub async fn ingest_until(
        &self,
        token: &str,
        body: Bytes,
        deadline: Option<RequestDeadline>,
    ) -> IngestOutcome {
        let timer = RequestTimer::new(Arc::clone(&self.metrics));
        let outcome = self.run(token, body, deadline).await;

        match &outcome {
            IngestOutcome::Accepted { .. } => timer.finish(RequestOutcome::Accepted),
            IngestOutcome::Rejected { error, .. } => timer.finish(RequestOutcome::from(error)),
        }
        outcome
    }

    async fn run(&self, token: &str, body: Bytes, deadline: Option<RequestDeadline>) -> IngestOutcome {
        let source = match self.authenticate(token).await {
            Ok(source) => source,
            Err(error) => return IngestOutcome::reject(error, body),
        };

        if !self.validator.is_valid(&body) {
            info!(
                source = %source.name,
                format = self.validator.format(),
                size = body.len(),
                "Rejected malformed payload"
            );
            let size = body.len();
            return IngestOutcome::reject(IngestError::MalformedPayload { size }, body);
        }

        // Past the deadline the client has been answered 504: never publish.
        if deadline.is_some_and(|d| d.expired()) {
            warn!(
                source = %source.name,
                timeout_ms = self.request_timeout.as_millis() as u64,
                "Request deadline passed before publish, dropping event"
            );
            return IngestOutcome::reject(IngestError::DeadlineExceeded(self.request_timeout), body);
        }

        let message = OutboundMessage::new(self.topic.clone(), body.clone())
            .with_header(self.auth_header.clone(), source.authorization_key.as_bytes());

        match self.publisher.submit(message, &source.name) {
            Ok(message_id) => {
                debug!(message_id = %message_id, source = %source.name, "Accepted event");
                IngestOutcome::Accepted { message_id, body }
            }
            Err(err) => IngestOutcome::reject(IngestError::PublishRejected(err), body),
        }
    }

    /// Look the token up and check it against the stored key.
    async fn authenticate(&self, token: &str) -> Result<SourceRecord, IngestError> {
        let lookup = tokio::time::timeout(self.lookup_timeout, self.directory.lookup(token))
            .await
            .unwrap_or(Err(DirectoryError::Timeout(self.lookup_timeout)));

        let record = match lookup {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(token_len = token.len(), "Unknown client");
                return Err(IngestError::Unauthorized(UnauthorizedReason::UnknownClient));
            }
            Err(err @ DirectoryError::MalformedRecord(_)) => {
                warn!(error = %err, "Directory record has unexpected shape");
                return Err(err.into());
            }
            Err(err) => {
                error!(error = %err, "Directory lookup failed");
                return Err(err.into());
            }
        };

        if !constant_time_compare(token, &record.authorization_key) {
            warn!(source = %record.name, "Authorization key mismatch");
            return Err(IngestError::Unauthorized(UnauthorizedReason::KeyMismatch));
        }

        debug!(source = %record.name, "Source authenticated");
        Ok(record)
    }
}

/// Axum entry point for the ingest route.
///
/// The pipeline runs on its own task so that a client hanging up does not
/// cancel a lookup or publish halfway through.
pub async fn handle_ingest(
    State(handler): State<Arc<IngestionHandler>>,
    Query(params): Query<Vec<(String, String)>>,
    deadline: Option<Extension<RequestDeadline>>,
    body: Bytes,
) -> Response {
    let token = credential::extract_token(&params).to_owned();
    let deadline = deadline.map(|Extension(d)| d);

    let task = tokio::spawn(async move {
        match deadline {
            Some(deadline) => handler.ingest_until(&token, body, Some(deadline)).await,
            None => handler.ingest(&token, body).await,
        }
    });
    match task.await {
        Ok(outcome) => outcome.into_response(),
        Err(err) => {
            error!(error = %err, "Ingest task failed");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
