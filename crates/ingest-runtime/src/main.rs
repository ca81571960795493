//! # Ingestion Gateway
//!
//! Accepts events from registered sources over HTTP and publishes them to
//! the event log.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging (`RUST_LOG`, `INGEST_LOG_FORMAT`)
//! 2. Load configuration (`INGEST_CONFIG` file, then `INGEST_*` overrides)
//! 3. Load the source directory and start the event log
//! 4. Ping the directory, start the confirmation loop, bind listeners
//! 5. Serve until Ctrl+C / SIGTERM, then drain and exit

use anyhow::Result;
use ingest_runtime::{init_logging, load_config, shutdown_signal, IngestRuntime};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = load_config()?;
    info!(
        http = %config.http_addr(),
        admin = %config.admin_addr(),
        admin_enabled = config.admin.enabled,
        "Ingestion gateway v{}",
        ingest_gateway::VERSION
    );

    let runtime = IngestRuntime::new(config)?;

    info!("Gateway is running. Press Ctrl+C to stop.");
    runtime.run_until(shutdown_signal()).await
}
