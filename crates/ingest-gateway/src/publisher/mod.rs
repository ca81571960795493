//! Event publisher.
//!
//! Wraps the shared bus producer. `submit` never waits: a full local buffer
//! is reported straight back to the caller as backpressure.

pub mod confirmation;
pub mod tracker;

pub use confirmation::confirmation_loop;
pub use tracker::{sweep_task, Confirmed, DeliverySnapshot, DeliveryTracker};

use crate::domain::error::PublishError;
use ingest_bus::{BusProducer, DeliveryReport, MessageId, OutboundMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Shared publisher handle.
pub struct EventPublisher {
    producer: Arc<dyn BusProducer>,
    tracker: Arc<DeliveryTracker>,
}

impl EventPublisher {
    pub fn new(producer: Arc<dyn BusProducer>, tracker: Arc<DeliveryTracker>) -> Self {
        Self { producer, tracker }
    }

    /// Enqueue `message` on behalf of `source`.
    ///
    /// The message is tracked before it reaches the bus so a fast report
    /// always finds its entry.
    pub fn submit(&self, message: OutboundMessage, source: &str) -> Result<MessageId, PublishError> {
        let id = message.id;
        self.tracker.register(id, source, message.len());

        match self.producer.try_send(message) {
            Ok(()) => {
                debug!(message_id = %id, source = %source, "Queued message");
                Ok(id)
            }
            Err(err) => {
                self.tracker.cancel(&id);
                let err = PublishError::from(err);
                warn!(source = %source, error = %err, "Publish rejected");
                Err(err)
            }
        }
    }

    /// Take the delivery report stream (once).
    pub fn take_delivery_reports(&self) -> Option<mpsc::UnboundedReceiver<DeliveryReport>> {
        self.producer.take_delivery_reports()
    }

    /// Wait for in-flight messages, bounded by `timeout`.
    pub async fn flush(&self, timeout: Duration) -> Result<(), PublishError> {
        let in_flight = self.producer.in_flight();
        if in_flight > 0 {
            info!(in_flight = in_flight, "Flushing publisher");
        }
        self.producer.flush(timeout).await.map_err(PublishError::from)
    }

    /// Stop accepting messages; anything still buffered is purged.
    pub fn close(&self) {
        self.producer.close();
    }

    /// Messages accepted by the bus but not yet reported.
    pub fn in_flight(&self) -> usize {
        self.producer.in_flight()
    }

    /// Delivery tracker shared with the confirmation loop.
    pub fn tracker(&self) -> Arc<DeliveryTracker> {
        Arc::clone(&self.tracker)
    }
}
