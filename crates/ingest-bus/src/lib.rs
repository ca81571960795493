//! # Ingest Bus - Producer Port for the Event Log
//!
//! The gateway forwards accepted events to a durable, partitioned, append-only log.
//! This crate defines the narrow producer port the gateway talks to and an
//! in-process implementation of it.
//!
//! ## Delivery Model
//!
//! ```text
//! ┌──────────────┐  try_send()   ┌──────────────┐   append    ┌──────────────────┐
//! │   Producer   │ ────────────→ │ Local Buffer │ ──────────→ │ Partitioned Log  │
//! │  (gateway)   │  (bounded)    │   (mpsc)     │  (broker)   │ topic[p] @offset │
//! └──────────────┘               └──────────────┘             └────────┬─────────┘
//!        ↑                                                             │
//!        │                  DeliveryReport (one per message)           │
//!        └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - `try_send` never waits: a full local buffer is reported as
//!   [`BusError::QueueFull`] so callers can apply backpressure.
//! - Every accepted message produces exactly one [`DeliveryReport`], success
//!   (topic/partition/offset) or failure (error detail).
//! - `flush` waits for in-flight messages up to a deadline; `close` purges
//!   whatever is still buffered.
//!
//! Production deployments put a Kafka-compatible client behind [`BusProducer`];
//! [`InMemoryLog`] is the single-process implementation.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod log;
pub mod message;
pub mod producer;
pub mod report;

pub use log::{InMemoryLog, LogConfig, StoredRecord};
pub use message::{Header, MessageId, OutboundMessage};
pub use producer::{BusError, BusProducer};
pub use report::{DeliveryError, DeliveryReport, Destination};

/// Default number of messages the local buffer holds before rejecting sends.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100_000;

/// Default partition count for topics created by [`InMemoryLog`].
pub const DEFAULT_PARTITIONS: u32 = 3;

/// Default maximum size of a single message value in bytes.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1_000_000;
