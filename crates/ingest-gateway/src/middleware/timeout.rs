//! Request deadline middleware.
//!
//! Answers 504 when the inner service has not produced a response in time.
//! The deadline is stored in the request extensions as [`RequestDeadline`] so
//! handlers can stop work the client will never see.

use crate::middleware::metrics::IngestMetrics;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tower::{Layer, Service};
use tracing::warn;

/// Instant at which the layer answers 504.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDeadline(pub Instant);

impl RequestDeadline {
    /// Whether the deadline has passed.
    pub fn expired(&self) -> bool {
        Instant::now() >= self.0
    }
}

/// Timeout layer
#[derive(Clone)]
pub struct TimeoutLayer {
    deadline: Duration,
    metrics: Option<Arc<IngestMetrics>>,
}

impl TimeoutLayer {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            metrics: None,
        }
    }

    /// Count timed-out requests.
    pub fn with_metrics(mut self, metrics: Arc<IngestMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            deadline: self.deadline,
            metrics: self.metrics.clone(),
        }
    }
}

/// Timeout service
#[derive(Clone)]
pub struct TimeoutService<S> {
    inner: S,
    deadline: Duration,
    metrics: Option<Arc<IngestMetrics>>,
}

impl<S> Service<Request<Body>> for TimeoutService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let deadline = self.deadline;
        let metrics = self.metrics.clone();
        let mut inner = self.inner.clone();

        let Some(expires) = Instant::now().checked_add(deadline) else {
            return Box::pin(inner.call(req));
        };
        req.extensions_mut().insert(RequestDeadline(expires));

        Box::pin(async move {
            match timeout_at(expires, inner.call(req)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_ms = deadline.as_millis() as u64, "Request timed out");
                    if let Some(metrics) = metrics {
                        metrics.record_timeout();
                    }
                    Ok(timeout_response())
                }
            }
        })
    }
}

/// 504 with the JSON error body.
fn timeout_response() -> Response {
    (
        StatusCode::GATEWAY_TIMEOUT,
        Json(serde_json::json!({ "error": true, "message": "Request Timeout" })),
    )
        .into_response()
}
