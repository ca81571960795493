//! Middleware stack for the ingestion gateway.
//!
//! Layer order: Request → Tracing → Timeout → BodyLimit → Handler

pub mod metrics;
pub mod timeout;
pub mod tracing;

pub use metrics::{IngestMetrics, RequestOutcome, RequestTimer};
pub use timeout::{RequestDeadline, TimeoutLayer};
pub use tracing::{TraceParent, TracingLayer};
