//! Logging initialisation.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Set to `json` for one JSON object per log line.
pub const LOG_FORMAT_ENV: &str = "INGEST_LOG_FORMAT";

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = matches!(std::env::var(LOG_FORMAT_ENV).as_deref(), Ok("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
