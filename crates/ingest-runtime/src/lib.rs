//! # Ingest Runtime Library
//!
//! Configuration loading, logging setup and process wiring for the
//! `ingest-runtime` binary, exposed here for testing.

#![allow(missing_docs)]

pub mod config;
pub mod logging;
pub mod runtime;

pub use config::{apply_env_overrides, load_config, load_config_with};
pub use logging::init_logging;
pub use runtime::{shutdown_signal, IngestRuntime};
