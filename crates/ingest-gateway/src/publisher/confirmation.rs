//! Confirmation loop.
//!
//! Drains the bus's delivery report stream for the lifetime of the producer.
//! Outcomes only reach logs and metrics; nothing flows back to requests.

use crate::middleware::metrics::IngestMetrics;
use crate::publisher::tracker::DeliveryTracker;
use ingest_bus::DeliveryReport;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Run until the report stream ends (the producer was closed).
pub async fn confirmation_loop(
    mut reports: mpsc::UnboundedReceiver<DeliveryReport>,
    tracker: Arc<DeliveryTracker>,
    metrics: Arc<IngestMetrics>,
) {
    info!("[Confirmation] Draining delivery reports");

    while let Some(report) = reports.recv().await {
        handle_report(&report, &tracker, &metrics);
    }

    info!(
        in_flight = tracker.in_flight_count(),
        "[Confirmation] Delivery report stream closed"
    );
}

fn handle_report(report: &DeliveryReport, tracker: &DeliveryTracker, metrics: &IngestMetrics) {
    let confirmed = tracker.confirm(report);

    match (&report.result, confirmed) {
        (Ok(destination), Some(entry)) => {
            metrics.record_delivered(entry.bytes);
            info!(
                message_id = %report.id,
                source = %entry.source,
                destination = %destination,
                latency_ms = entry.latency.as_millis() as u64,
                "Delivered message"
            );
        }
        (Err(error), Some(entry)) => {
            metrics.record_delivery_failed();
            warn!(
                message_id = %report.id,
                source = %entry.source,
                topic = %report.topic,
                error = %error,
                "Delivery failed"
            );
        }
        // Swept or never registered: counted by the tracker as unknown only.
        (result, None) => {
            warn!(
                message_id = %report.id,
                topic = %report.topic,
                succeeded = result.is_ok(),
                "Delivery report for untracked message"
            );
        }
    }
}
