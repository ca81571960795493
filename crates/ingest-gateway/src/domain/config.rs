//! Gateway configuration with validation.

use ingest_bus::LogConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Ingest listener
    pub http: HttpConfig,
    /// Admin listener (localhost only by default)
    pub admin: AdminConfig,
    /// Source directory
    pub directory: DirectoryConfig,
    /// Event bus producer
    pub bus: BusConfig,
    /// Delivery confirmation tracking
    pub delivery: DeliveryConfig,
    /// Request limits
    pub limits: LimitsConfig,
    /// Timeouts
    pub timeouts: TimeoutConfig,
}

impl IngestConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin.enabled && self.admin.port == self.http.port && self.http.port != 0 {
            return Err(ConfigError::DuplicatePorts);
        }

        if self.bus.topic.trim().is_empty() {
            return Err(ConfigError::Invalid("bus.topic cannot be empty".into()));
        }
        if self.bus.auth_header.trim().is_empty() {
            return Err(ConfigError::Invalid("bus.auth_header cannot be empty".into()));
        }
        if self.bus.partitions == 0 {
            return Err(ConfigError::InvalidLimit("bus.partitions cannot be 0".into()));
        }
        if self.bus.queue_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "bus.queue_capacity cannot be 0".into(),
            ));
        }
        if self.bus.max_message_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "bus.max_message_bytes cannot be 0".into(),
            ));
        }

        if self.limits.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        let timeouts = [
            ("timeouts.request", self.timeouts.request),
            ("timeouts.directory", self.timeouts.directory),
            ("bus.flush_timeout", self.bus.flush_timeout),
            ("delivery.confirm_timeout", self.delivery.confirm_timeout),
            ("delivery.sweep_interval", self.delivery.sweep_interval),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(ConfigError::InvalidTimeout(format!("{name} cannot be 0")));
            }
        }

        // Directory lookups must give up before the request does.
        if self.timeouts.request <= self.timeouts.directory {
            return Err(ConfigError::InvalidTimeout(format!(
                "timeouts.request ({:?}) must be longer than timeouts.directory ({:?})",
                self.timeouts.request, self.timeouts.directory
            )));
        }

        Ok(())
    }

    /// Ingest listener bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Admin listener bind address
    pub fn admin_addr(&self) -> SocketAddr {
        SocketAddr::new(self.admin.host, self.admin.port)
    }

    /// Settings for the in-process event log
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            topics: vec![self.bus.topic.clone()],
            partitions: self.bus.partitions,
            queue_capacity: self.bus.queue_capacity,
            max_message_bytes: self.bus.max_message_bytes,
        }
    }
}

/// Ingest listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8082)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8082,
        }
    }
}

/// Admin listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Bind address (localhost only by default)
    pub host: IpAddr,
    /// Port (default: 9082)
    pub port: u16,
    /// Enable admin listener
    pub enabled: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 9082,
            enabled: true,
        }
    }
}

/// Source directory configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// JSON file with an array of source documents to load at startup
    pub seed_path: Option<PathBuf>,
}

/// Event bus producer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Destination topic for every accepted event
    pub topic: String,
    /// Header carrying the source's authorization key
    pub auth_header: String,
    /// Partitions per topic
    pub partitions: u32,
    /// Local buffer capacity in messages
    pub queue_capacity: usize,
    /// Largest message value in bytes
    pub max_message_bytes: usize,
    /// How long shutdown waits for in-flight messages
    #[serde(with = "humantime_serde")]
    pub flush_timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            topic: "Events".to_string(),
            auth_header: "AlertKey".to_string(),
            partitions: ingest_bus::DEFAULT_PARTITIONS,
            queue_capacity: ingest_bus::DEFAULT_QUEUE_CAPACITY,
            max_message_bytes: ingest_bus::DEFAULT_MAX_MESSAGE_BYTES,
            flush_timeout: Duration::from_secs(10),
        }
    }
}

/// Delivery confirmation tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Age after which an unconfirmed message is reported and dropped from tracking
    #[serde(with = "humantime_serde")]
    pub confirm_timeout: Duration,
    /// How often the tracker is swept
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            confirm_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(10),
        }
    }
}

/// Request limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max request body size in bytes (default: 1MB)
    pub max_request_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024, // 1MB
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request deadline
    #[serde(with = "humantime_serde")]
    pub request: Duration,
    /// Directory lookup deadline
    #[serde(with = "humantime_serde")]
    pub directory: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(30),
            directory: Duration::from_secs(5),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Ingest and admin listeners on the same port
    #[error("duplicate ports configured")]
    DuplicatePorts,
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Duration (de)serialization as `"250ms"`, `"5s"`, `"2m"`
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nanos = duration.subsec_nanos();
        let text = if nanos == 0 {
            format!("{}s", duration.as_secs())
        } else if nanos % 1_000_000 == 0 {
            format!("{}ms", duration.as_millis())
        } else if nanos % 1_000 == 0 {
            format!("{}us", duration.as_micros())
        } else {
            format!("{}ns", duration.as_nanos())
        };
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        let number = |n: &str, err| n.trim().parse::<u64>().map_err(|_| err);

        // Two-letter suffixes all end in 's', so they go first
        if let Some(ns) = s.strip_suffix("ns") {
            number(ns, "invalid nanoseconds").map(Duration::from_nanos)
        } else if let Some(us) = s.strip_suffix("us") {
            number(us, "invalid microseconds").map(Duration::from_micros)
        } else if let Some(ms) = s.strip_suffix("ms") {
            number(ms, "invalid milliseconds").map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            number(secs, "invalid seconds").map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            number(mins, "invalid minutes")?
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or("minutes out of range")
        } else {
            number(s, "invalid duration format").map(Duration::from_secs)
        }
    }
}
