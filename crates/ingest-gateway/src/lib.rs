// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! Ingestion gateway - authenticates event sources and publishes their
//! payloads to the event log.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         INGESTION GATEWAY                            │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐                         ┌─────────────────┐     │
//! │  │  Ingest (HTTP)  │                         │      Admin      │     │
//! │  │    Port 8082    │                         │    Port 9082    │     │
//! │  └────────┬────────┘                         └────────┬────────┘     │
//! │           │                                           │              │
//! │  ┌────────┴────────────────────────┐          health / metrics /     │
//! │  │  Tracing → Timeout → BodyLimit  │          deliveries             │
//! │  └────────┬────────────────────────┘                                 │
//! │           │                                                          │
//! │  ┌────────┴─────────────────────────────────────────────┐            │
//! │  │ IngestionHandler                                     │            │
//! │  │  directory lookup → key compare → validate → submit  │            │
//! │  └────────┬───────────────────────────────┬─────────────┘            │
//! │           │                               │                          │
//! │  ┌────────┴────────┐            ┌─────────┴─────────┐                │
//! │  │ DirectoryClient │            │  EventPublisher   │                │
//! │  └─────────────────┘            │  + DeliveryTracker│                │
//! │                                 └─────────┬─────────┘                │
//! │                                           │ try_send                 │
//! └───────────────────────────────────────────┼──────────────────────────┘
//!                                             ▼
//!                                   BusProducer (ingest-bus)
//!                                             │ delivery reports
//!                                             ▼
//!                                    confirmation loop
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ingest_gateway::{IngestConfig, IngestGatewayService, InMemoryDirectory, JsonValidator};
//! use ingest_bus::InMemoryLog;
//!
//! let config = IngestConfig::default();
//! let log = InMemoryLog::start(config.log_config());
//! let service = IngestGatewayService::new(
//!     config,
//!     Arc::new(InMemoryDirectory::new()),
//!     log,
//!     Arc::new(JsonValidator),
//! )?;
//! service.run().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ingest;
pub mod middleware;
pub mod ports;
pub mod publisher;
pub mod service;

// Re-exports for public API
pub use adapters::InMemoryDirectory;
pub use domain::config::{ConfigError, IngestConfig};
pub use domain::error::{GatewayError, IngestError, PublishError, UnauthorizedReason};
pub use domain::source::{SourceDocument, SourceRecord};
pub use ingest::{IngestOutcome, IngestionHandler, JsonValidator, PayloadValidator};
pub use middleware::IngestMetrics;
pub use ports::{DirectoryClient, DirectoryError};
pub use publisher::{DeliverySnapshot, DeliveryTracker, EventPublisher};
pub use service::IngestGatewayService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
