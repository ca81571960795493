//! Ports the gateway depends on.
//!
//! The event bus port lives in `ingest-bus` ([`ingest_bus::BusProducer`]).

pub mod directory;

pub use directory::{DirectoryClient, DirectoryError};
