//! Ingestion metrics.
//!
//! Plain atomic counters, exported as JSON on the admin listener and as
//! Prometheus text when the `metrics` feature is enabled.

use crate::domain::error::{IngestError, UnauthorizedReason};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Accepted,
    UnknownClient,
    KeyMismatch,
    MalformedPayload,
    DirectoryUnavailable,
    Backpressure,
    Expired,
}

impl From<&IngestError> for RequestOutcome {
    fn from(err: &IngestError) -> Self {
        match err {
            IngestError::DirectoryUnavailable(_) => RequestOutcome::DirectoryUnavailable,
            IngestError::Unauthorized(UnauthorizedReason::UnknownClient) => {
                RequestOutcome::UnknownClient
            }
            IngestError::Unauthorized(UnauthorizedReason::KeyMismatch) => {
                RequestOutcome::KeyMismatch
            }
            IngestError::MalformedPayload { .. } => RequestOutcome::MalformedPayload,
            IngestError::PublishRejected(_) => RequestOutcome::Backpressure,
            IngestError::DeadlineExceeded(_) => RequestOutcome::Expired,
        }
    }
}

/// Gateway metrics
#[derive(Default)]
pub struct IngestMetrics {
    // Request counters
    pub requests_total: AtomicU64,
    pub accepted: AtomicU64,
    pub unknown_client: AtomicU64,
    pub key_mismatch: AtomicU64,
    pub malformed_payload: AtomicU64,
    pub directory_unavailable: AtomicU64,
    pub backpressure: AtomicU64,
    pub timeouts: AtomicU64,
    pub expired: AtomicU64,

    // Delivery counters
    pub delivered: AtomicU64,
    pub delivery_failed: AtomicU64,
    pub payload_bytes: AtomicU64,

    // Latency tracking (simplified - in production use histograms)
    pub total_latency_ms: AtomicU64,
    pub request_count_for_latency: AtomicU64,
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished request
    pub fn record_request(&self, outcome: RequestOutcome, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let counter = match outcome {
            RequestOutcome::Accepted => &self.accepted,
            RequestOutcome::UnknownClient => &self.unknown_client,
            RequestOutcome::KeyMismatch => &self.key_mismatch,
            RequestOutcome::MalformedPayload => &self.malformed_payload,
            RequestOutcome::DirectoryUnavailable => &self.directory_unavailable,
            RequestOutcome::Backpressure => &self.backpressure,
            RequestOutcome::Expired => &self.expired,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.request_count_for_latency
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that hit the request deadline
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a confirmed delivery
    pub fn record_delivered(&self, bytes: usize) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.payload_bytes
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a failed delivery
    pub fn record_delivery_failed(&self) {
        self.delivery_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get average latency in ms
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.request_count_for_latency.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn to_prometheus(&self) -> String {
        let counters = [
            ("ingest_requests_total", "Total ingest requests", &self.requests_total),
            ("ingest_accepted_total", "Events accepted and queued", &self.accepted),
            ("ingest_unknown_client_total", "Requests with unknown token", &self.unknown_client),
            ("ingest_key_mismatch_total", "Requests failing key comparison", &self.key_mismatch),
            ("ingest_malformed_payload_total", "Requests with malformed payload", &self.malformed_payload),
            ("ingest_directory_unavailable_total", "Requests failed by directory errors", &self.directory_unavailable),
            ("ingest_backpressure_total", "Requests rejected by a full queue", &self.backpressure),
            ("ingest_timeouts_total", "Requests past the deadline", &self.timeouts),
            ("ingest_expired_total", "Events dropped unpublished after the deadline", &self.expired),
            ("ingest_delivered_total", "Messages confirmed by the bus", &self.delivered),
            ("ingest_delivery_failed_total", "Messages the bus failed to persist", &self.delivery_failed),
            ("ingest_delivered_bytes_total", "Payload bytes confirmed by the bus", &self.payload_bytes),
        ];

        let mut output = String::new();
        for (name, help, counter) in counters {
            output.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {}\n",
                counter.load(Ordering::Relaxed)
            ));
        }

        output.push_str(&format!(
            "# HELP ingest_average_latency_ms Average request latency\n\
             # TYPE ingest_average_latency_ms gauge\n\
             ingest_average_latency_ms {:.2}\n",
            self.average_latency_ms()
        ));

        output
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "accepted": self.accepted.load(Ordering::Relaxed),
                "unknown_client": self.unknown_client.load(Ordering::Relaxed),
                "key_mismatch": self.key_mismatch.load(Ordering::Relaxed),
                "malformed_payload": self.malformed_payload.load(Ordering::Relaxed),
                "directory_unavailable": self.directory_unavailable.load(Ordering::Relaxed),
                "backpressure": self.backpressure.load(Ordering::Relaxed),
                "timeouts": self.timeouts.load(Ordering::Relaxed),
                "expired": self.expired.load(Ordering::Relaxed),
            },
            "deliveries": {
                "delivered": self.delivered.load(Ordering::Relaxed),
                "failed": self.delivery_failed.load(Ordering::Relaxed),
                "bytes": self.payload_bytes.load(Ordering::Relaxed),
            },
            "latency": {
                "average_ms": self.average_latency_ms(),
            }
        })
    }
}

/// Request timing helper
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<IngestMetrics>,
}

impl RequestTimer {
    pub fn new(metrics: Arc<IngestMetrics>) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    pub fn finish(self, outcome: RequestOutcome) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.metrics.record_request(outcome, latency_ms);
    }
}
