//! Delivery tracker.
//!
//! Correlates delivery reports with the messages the gateway submitted.
//!
//! Flow:
//! 1. Publisher calls `register()` before handing the message to the bus
//! 2. Bus emits a `DeliveryReport` carrying the same `MessageId`
//! 3. Confirmation loop calls `confirm()`, which removes the entry
//! 4. Entries nobody confirmed are dropped by `sweep_unconfirmed()`

use dashmap::DashMap;
use ingest_bus::{DeliveryReport, MessageId};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A message waiting for its delivery report
struct InFlight {
    source: String,
    bytes: usize,
    submitted_at: Instant,
}

/// What `confirm()` found for a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmed {
    /// Source that submitted the message
    pub source: String,
    /// Payload size
    pub bytes: usize,
    /// Time from submission to report
    pub latency: Duration,
}

/// Counters for the tracker
#[derive(Debug, Default)]
struct DeliveryStats {
    /// Messages registered
    submitted: AtomicU64,
    /// Reports with a destination
    delivered: AtomicU64,
    /// Reports with an error
    failed: AtomicU64,
    /// Entries swept without a report
    unconfirmed: AtomicU64,
    /// Reports for ids not in the table
    unknown: AtomicU64,
    /// Entries withdrawn because the bus refused the message
    cancelled: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliverySnapshot {
    pub in_flight: usize,
    pub submitted: u64,
    pub delivered: u64,
    pub failed: u64,
    pub unconfirmed: u64,
    pub unknown: u64,
    pub cancelled: u64,
}

/// Correlation table keyed by message id.
pub struct DeliveryTracker {
    in_flight: DashMap<MessageId, InFlight>,
    confirm_timeout: Duration,
    stats: DeliveryStats,
}

impl DeliveryTracker {
    /// Create a tracker; entries older than `confirm_timeout` are swept.
    pub fn new(confirm_timeout: Duration) -> Self {
        Self {
            in_flight: DashMap::new(),
            confirm_timeout,
            stats: DeliveryStats::default(),
        }
    }

    /// Start tracking a message.
    pub fn register(&self, id: MessageId, source: &str, bytes: usize) {
        self.in_flight.insert(
            id,
            InFlight {
                source: source.to_string(),
                bytes,
                submitted_at: Instant::now(),
            },
        );
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Withdraw a message the bus did not accept.
    pub fn cancel(&self, id: &MessageId) -> bool {
        if self.in_flight.remove(id).is_some() {
            self.stats.submitted.fetch_sub(1, Ordering::Relaxed);
            self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Settle a report against its entry.
    ///
    /// Returns `None` for a report whose id is not tracked.
    pub fn confirm(&self, report: &DeliveryReport) -> Option<Confirmed> {
        let Some((_, entry)) = self.in_flight.remove(&report.id) else {
            self.stats.unknown.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        if report.succeeded() {
            self.stats.delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        }

        Some(Confirmed {
            source: entry.source,
            bytes: entry.bytes,
            latency: entry.submitted_at.elapsed(),
        })
    }

    /// Drop entries older than the confirmation timeout.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_unconfirmed(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.in_flight.retain(|id, entry| {
            let age = now.duration_since(entry.submitted_at);
            if age > self.confirm_timeout {
                warn!(
                    message_id = %id,
                    source = %entry.source,
                    age_ms = age.as_millis() as u64,
                    "No delivery report received"
                );
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            self.stats
                .unconfirmed
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Messages waiting for a report
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether `id` is waiting for a report
    pub fn is_in_flight(&self, id: &MessageId) -> bool {
        self.in_flight.contains_key(id)
    }

    /// Copy the counters.
    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            in_flight: self.in_flight_count(),
            submitted: self.stats.submitted.load(Ordering::Relaxed),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            unconfirmed: self.stats.unconfirmed.load(Ordering::Relaxed),
            unknown: self.stats.unknown.load(Ordering::Relaxed),
            cancelled: self.stats.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Background task that sweeps unconfirmed entries
pub async fn sweep_task(tracker: std::sync::Arc<DeliveryTracker>, interval: Duration) {
    let mut sweep_interval = tokio::time::interval(interval);
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        sweep_interval.tick().await;
        let removed = tracker.sweep_unconfirmed();
        if removed > 0 {
            debug!(removed = removed, "Swept unconfirmed deliveries");
        }
    }
}
