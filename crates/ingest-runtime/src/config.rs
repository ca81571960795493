//! Configuration loading: optional JSON file, then environment overrides.

use anyhow::{Context, Result};
use ingest_gateway::IngestConfig;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Path to a JSON configuration file.
pub const CONFIG_ENV: &str = "INGEST_CONFIG";
/// Ingest listener port.
pub const HTTP_PORT_ENV: &str = "INGEST_HTTP_PORT";
/// Admin listener port.
pub const ADMIN_PORT_ENV: &str = "INGEST_ADMIN_PORT";
/// Directory seed file.
pub const DIRECTORY_SEED_ENV: &str = "INGEST_DIRECTORY_SEED";
/// Destination topic.
pub const TOPIC_ENV: &str = "INGEST_TOPIC";
/// Producer buffer capacity.
pub const QUEUE_CAPACITY_ENV: &str = "INGEST_QUEUE_CAPACITY";

/// Load configuration from the process environment.
pub fn load_config() -> Result<IngestConfig> {
    load_config_with(|key| std::env::var(key).ok())
}

/// Load configuration using `lookup` in place of the process environment.
pub fn load_config_with(lookup: impl Fn(&str) -> Option<String>) -> Result<IngestConfig> {
    let mut config = match lookup(CONFIG_ENV) {
        Some(path) => load_file(Path::new(&path))?,
        None => IngestConfig::default(),
    };

    apply_env_overrides(&mut config, &lookup);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Read a JSON configuration file. Missing fields take their defaults.
pub fn load_file(path: &Path) -> Result<IngestConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = IngestConfig::from_json(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    info!(path = %path.display(), "Loaded configuration file");
    Ok(config)
}

/// Apply `INGEST_*` overrides. Unparseable values are logged and ignored.
pub fn apply_env_overrides(config: &mut IngestConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(port) = parse_var(&lookup, HTTP_PORT_ENV) {
        config.http.port = port;
    }
    if let Some(port) = parse_var(&lookup, ADMIN_PORT_ENV) {
        config.admin.port = port;
    }
    if let Some(path) = lookup(DIRECTORY_SEED_ENV) {
        config.directory.seed_path = Some(PathBuf::from(path));
    }
    if let Some(topic) = lookup(TOPIC_ENV) {
        config.bus.topic = topic;
    }
    if let Some(capacity) = parse_var(&lookup, QUEUE_CAPACITY_ENV) {
        config.bus.queue_capacity = capacity;
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}
