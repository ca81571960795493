//! # Producer Port
//!
//! The interface the gateway uses to hand messages to the bus.

use crate::message::OutboundMessage;
use crate::report::DeliveryReport;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors returned synchronously by a producer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The local buffer is full.
    #[error("local queue full (capacity {capacity})")]
    QueueFull {
        /// Buffer capacity.
        capacity: usize,
    },

    /// The producer has been closed.
    #[error("producer closed")]
    Closed,

    /// `flush` gave up before all messages were delivered.
    #[error("flush timed out with {remaining} message(s) in flight")]
    FlushTimeout {
        /// Messages still waiting for a delivery report.
        remaining: usize,
    },
}

/// A shared producer handle.
///
/// Implementations are internally synchronised: callers share one handle
/// behind an `Arc` and call it from many tasks without extra locking.
#[async_trait]
pub trait BusProducer: Send + Sync {
    /// Enqueue a message without waiting.
    ///
    /// # Errors
    ///
    /// - [`BusError::QueueFull`] when the local buffer has no room
    /// - [`BusError::Closed`] after [`BusProducer::close`]
    fn try_send(&self, message: OutboundMessage) -> Result<(), BusError>;

    /// Take the delivery report stream.
    ///
    /// There is a single consumer per producer; later calls return `None`.
    fn take_delivery_reports(&self) -> Option<mpsc::UnboundedReceiver<DeliveryReport>>;

    /// Number of messages accepted but not yet reported.
    fn in_flight(&self) -> usize;

    /// Wait until every accepted message has been reported, or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// [`BusError::FlushTimeout`] with the number of messages still in flight.
    async fn flush(&self, timeout: Duration) -> Result<(), BusError>;

    /// Stop accepting messages and purge anything still buffered.
    ///
    /// The delivery report stream ends once the purge has been reported.
    fn close(&self);
}
