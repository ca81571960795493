//! # In-Memory Partitioned Log
//!
//! Single-process implementation of [`BusProducer`].
//!
//! Messages go into a bounded local buffer; a broker task appends them to
//! per-topic partitions (round-robin) and emits one [`DeliveryReport`] per
//! message. Distributed deployments replace this with a Kafka-compatible
//! client behind the same trait.

use crate::message::{Header, MessageId, OutboundMessage};
use crate::producer::{BusError, BusProducer};
use crate::report::{DeliveryError, DeliveryReport, Destination};
use crate::{DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_PARTITIONS, DEFAULT_QUEUE_CAPACITY};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Log configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Topics that exist from the start.
    pub topics: Vec<String>,
    /// Partitions per topic.
    pub partitions: u32,
    /// Local buffer capacity in messages.
    pub queue_capacity: usize,
    /// Largest accepted value in bytes.
    pub max_message_bytes: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            topics: vec!["Events".to_string()],
            partitions: DEFAULT_PARTITIONS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

/// A record persisted in a partition.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// Id of the message that produced this record.
    pub id: MessageId,
    /// Offset within the partition.
    pub offset: u64,
    /// Headers as submitted.
    pub headers: Vec<Header>,
    /// Value as submitted.
    pub value: Bytes,
    /// Append time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl StoredRecord {
    /// First header value with the given name.
    pub fn header(&self, key: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|h| h.key == key)
            .map(|h| h.value.as_slice())
    }
}

/// State shared between the producer handle and the broker task.
struct LogState {
    partitions: u32,
    max_message_bytes: usize,
    topics: RwLock<HashMap<String, Vec<Vec<StoredRecord>>>>,
    next_partition: AtomicU64,
    in_flight: AtomicUsize,
    drained: Notify,
    appended: AtomicU64,
}

impl LogState {
    fn append(&self, message: &OutboundMessage) -> Result<Destination, DeliveryError> {
        if message.value.len() > self.max_message_bytes {
            return Err(DeliveryError::MessageTooLarge {
                size: message.value.len(),
                max: self.max_message_bytes,
            });
        }

        let mut topics = self.topics.write();
        let partitions = topics
            .get_mut(&message.topic)
            .ok_or_else(|| DeliveryError::UnknownTopic(message.topic.clone()))?;

        let count = u64::from(self.partitions.max(1));
        let index = self.next_partition.fetch_add(1, Ordering::Relaxed) % count;
        let partition = &mut partitions[index as usize];
        let offset = partition.len() as u64;

        partition.push(StoredRecord {
            id: message.id,
            offset,
            headers: message.headers.clone(),
            value: message.value.clone(),
            timestamp_ms: now_ms(),
        });
        self.appended.fetch_add(1, Ordering::Relaxed);

        Ok(Destination {
            topic: message.topic.clone(),
            partition: index as u32,
            offset,
        })
    }

    fn finish_one(&self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Broker side: drains the local buffer into the log.
struct Broker {
    buffer: mpsc::Receiver<OutboundMessage>,
    reports: mpsc::UnboundedSender<DeliveryReport>,
    state: Arc<LogState>,
}

impl Broker {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("[InMemoryLog] Broker started");

        // close() may have run before this receiver existed.
        let mut stopping = *shutdown.borrow_and_update();

        while !stopping {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    stopping = changed.is_err() || *shutdown.borrow();
                }
                next = self.buffer.recv() => match next {
                    Some(message) => self.deliver(message),
                    None => stopping = true,
                },
            }
        }

        self.purge();
        info!("[InMemoryLog] Broker stopped");
    }

    fn deliver(&self, message: OutboundMessage) {
        let result = self.state.append(&message);
        if let Err(e) = &result {
            debug!(message_id = %message.id, error = %e, "Append rejected");
        }
        self.report(DeliveryReport {
            id: message.id,
            topic: message.topic,
            result,
        });
    }

    fn purge(&mut self) {
        self.buffer.close();
        let mut purged = 0usize;
        while let Ok(message) = self.buffer.try_recv() {
            purged += 1;
            self.report(DeliveryReport {
                id: message.id,
                topic: message.topic,
                result: Err(DeliveryError::Purged),
            });
        }
        if purged > 0 {
            warn!(purged = purged, "Purged undelivered messages on close");
        }
    }

    fn report(&self, report: DeliveryReport) {
        if self.reports.send(report).is_err() {
            debug!("Delivery report receiver dropped");
        }
        self.state.finish_one();
    }
}

/// In-memory partitioned append log.
pub struct InMemoryLog {
    state: Arc<LogState>,
    sender: mpsc::Sender<OutboundMessage>,
    broker: Mutex<Option<Broker>>,
    reports: Mutex<Option<mpsc::UnboundedReceiver<DeliveryReport>>>,
    shutdown: watch::Sender<bool>,
    closed: AtomicBool,
    capacity: usize,
}

impl InMemoryLog {
    /// Create a log without starting its broker.
    ///
    /// Messages accumulate in the local buffer until [`InMemoryLog::spawn_broker`]
    /// is called.
    #[must_use]
    pub fn new(config: LogConfig) -> Self {
        let capacity = config.queue_capacity.max(1);
        let (sender, buffer) = mpsc::channel(capacity);
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);

        let partitions = config.partitions.max(1);
        let topics = config
            .topics
            .iter()
            .map(|t| (t.clone(), empty_partitions(partitions)))
            .collect();

        let state = Arc::new(LogState {
            partitions,
            max_message_bytes: config.max_message_bytes,
            topics: RwLock::new(topics),
            next_partition: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            drained: Notify::new(),
            appended: AtomicU64::new(0),
        });

        let broker = Broker {
            buffer,
            reports: reports_tx,
            state: Arc::clone(&state),
        };

        Self {
            state,
            sender,
            broker: Mutex::new(Some(broker)),
            reports: Mutex::new(Some(reports_rx)),
            shutdown,
            closed: AtomicBool::new(false),
            capacity,
        }
    }

    /// Create a log and start its broker on the current runtime.
    pub fn start(config: LogConfig) -> Arc<Self> {
        let log = Arc::new(Self::new(config));
        log.spawn_broker();
        log
    }

    /// Start the broker task. Returns `None` if it was already started or the log is closed.
    pub fn spawn_broker(&self) -> Option<JoinHandle<()>> {
        // Subscribe first so a close() racing with startup is never missed.
        let shutdown = self.shutdown.subscribe();
        let broker = self.broker.lock().take()?;
        Some(tokio::spawn(broker.run(shutdown)))
    }

    /// Create a topic if it does not exist yet.
    pub fn create_topic(&self, topic: &str) {
        self.state
            .topics
            .write()
            .entry(topic.to_string())
            .or_insert_with(|| empty_partitions(self.state.partitions));
    }

    /// Whether `topic` exists.
    pub fn has_topic(&self, topic: &str) -> bool {
        self.state.topics.read().contains_key(topic)
    }

    /// Records in one partition, in offset order.
    pub fn records(&self, topic: &str, partition: u32) -> Vec<StoredRecord> {
        self.state
            .topics
            .read()
            .get(topic)
            .and_then(|parts| parts.get(partition as usize))
            .cloned()
            .unwrap_or_default()
    }

    /// All records of a topic, partition by partition.
    pub fn topic_records(&self, topic: &str) -> Vec<StoredRecord> {
        self.state
            .topics
            .read()
            .get(topic)
            .map(|parts| parts.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Partitions per topic.
    pub fn partitions(&self) -> u32 {
        self.state.partitions
    }

    /// Local buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total records appended across all topics.
    pub fn appended(&self) -> u64 {
        self.state.appended.load(Ordering::Relaxed)
    }

    /// Whether [`BusProducer::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl BusProducer for InMemoryLog {
    fn try_send(&self, message: OutboundMessage) -> Result<(), BusError> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }

        // Count before handing over so the broker never reports an uncounted message.
        self.state.in_flight.fetch_add(1, Ordering::AcqRel);

        match self.sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.state.finish_one();
                Err(BusError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.state.finish_one();
                Err(BusError::Closed)
            }
        }
    }

    fn take_delivery_reports(&self) -> Option<mpsc::UnboundedReceiver<DeliveryReport>> {
        self.reports.lock().take()
    }

    fn in_flight(&self) -> usize {
        self.state.in_flight.load(Ordering::Acquire)
    }

    async fn flush(&self, timeout: Duration) -> Result<(), BusError> {
        let drained = async {
            loop {
                let notified = self.state.drained.notified();
                if self.in_flight() == 0 {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, drained)
            .await
            .map_err(|_| BusError::FlushTimeout {
                remaining: self.in_flight(),
            })
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(in_flight = self.in_flight(), "[InMemoryLog] Closing producer");

        // Broker never started: purge inline so the report stream still ends.
        if let Some(mut broker) = self.broker.lock().take() {
            broker.purge();
            return;
        }
        self.shutdown.send_replace(true);
    }
}

fn empty_partitions(count: u32) -> Vec<Vec<StoredRecord>> {
    (0..count).map(|_| Vec::new()).collect()
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
