//! # Delivery Reports
//!
//! Asynchronous outcome of a single submitted message.

use crate::message::MessageId;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Where a message ended up in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    /// Topic name.
    pub topic: String,
    /// Partition index.
    pub partition: u32,
    /// Offset within the partition.
    pub offset: u64,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]@{}", self.topic, self.partition, self.offset)
    }
}

/// Why a message was not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The topic does not exist on the log.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    /// The value exceeds the per-message size limit.
    #[error("message size {size} exceeds limit {max}")]
    MessageTooLarge {
        /// Actual value size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The producer was closed while the message was still buffered.
    #[error("purged from queue before delivery")]
    Purged,
}

/// Outcome for one message, emitted exactly once by the log.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    /// Id of the message this report belongs to.
    pub id: MessageId,
    /// Topic the message was addressed to.
    pub topic: String,
    /// Destination on success, error detail on failure.
    pub result: Result<Destination, DeliveryError>,
}

impl DeliveryReport {
    /// Whether the message was persisted.
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}
