//! # Outbound Messages
//!
//! The unit submitted to the bus, and the opaque id used to match it with its
//! delivery report.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque per-message id carried alongside a message to the bus.
///
/// Uses UUID v7 so ids are unique and time-ordered, which keeps log lines for
/// a single message easy to follow. The id is never written into the message
/// headers; it only travels between producer and delivery report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a new message id (UUID v7)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single message header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header name.
    pub key: String,
    /// Raw header value.
    pub value: Vec<u8>,
}

/// A message bound for the bus.
///
/// `value` is kept as [`Bytes`] so the payload travels from the HTTP body to
/// the log without being copied or re-encoded.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Correlation id for the delivery report.
    pub id: MessageId,
    /// Logical destination.
    pub topic: String,
    /// Ordered headers.
    pub headers: Vec<Header>,
    /// Payload, byte-for-byte.
    pub value: Bytes,
}

impl OutboundMessage {
    /// Create a message for `topic` with a fresh id and no headers.
    pub fn new(topic: impl Into<String>, value: Bytes) -> Self {
        Self {
            id: MessageId::new(),
            topic: topic.into(),
            headers: Vec::new(),
            value,
        }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push(Header {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// First header value with the given name.
    pub fn header(&self, key: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|h| h.key == key)
            .map(|h| h.value.as_slice())
    }

    /// Size of the payload in bytes.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}
