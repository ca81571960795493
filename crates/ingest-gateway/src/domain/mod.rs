//! Domain types for the ingestion gateway.
//!
//! Configuration, error taxonomy and source records. No I/O lives here.

pub mod config;
pub mod error;
pub mod source;

pub use config::{
    AdminConfig, BusConfig, ConfigError, DeliveryConfig, DirectoryConfig, HttpConfig,
    IngestConfig, LimitsConfig, TimeoutConfig,
};
pub use error::{GatewayError, IngestError, PublishError, UnauthorizedReason};
pub use source::{SourceDocument, SourceRecord};
