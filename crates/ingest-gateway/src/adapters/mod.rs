//! Adapters for the ingestion gateway.
//!
//! Infrastructure implementations of the gateway's ports.

pub mod directory;

pub use directory::InMemoryDirectory;
