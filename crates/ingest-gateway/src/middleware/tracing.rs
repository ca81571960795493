//! Request tracing middleware.
//!
//! Opens one `ingest_request` span per request and links it to an incoming
//! W3C `traceparent` when the caller sends one.

use axum::{body::Body, http::Request, response::Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

/// Tracing layer that creates spans for each request
#[derive(Clone, Default)]
pub struct TracingLayer;

impl TracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

/// Tracing service
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for TracingService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();

        let span = info_span!(
            "ingest_request",
            http.method = %req.method(),
            http.target = %req.uri().path(),
            http.status_code = tracing::field::Empty,
            trace_id = tracing::field::Empty,
            parent_span_id = tracing::field::Empty,
        );

        if let Some(parent) = TraceParent::from_request(&req) {
            span.record("trace_id", parent.trace_id.as_str());
            span.record("parent_span_id", parent.parent_id.as_str());
        }

        let status_span = span.clone();
        Box::pin(
            async move {
                let result = inner.call(req).await;
                if let Ok(response) = &result {
                    status_span.record("http.status_code", response.status().as_u16());
                }
                result
            }
            .instrument(span),
        )
    }
}

/// Parsed W3C `traceparent` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceParent {
    pub trace_id: String,
    pub parent_id: String,
}

impl TraceParent {
    /// `version-trace_id-parent_id-flags`, with hex ids of 32 and 16 digits.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let (_version, trace_id, parent_id, _flags) =
            (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }

        let is_hex = |s: &str, len: usize| {
            s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
        };
        if !is_hex(trace_id, 32) || !is_hex(parent_id, 16) {
            return None;
        }

        Some(Self {
            trace_id: trace_id.to_string(),
            parent_id: parent_id.to_string(),
        })
    }

    fn from_request<B>(req: &Request<B>) -> Option<Self> {
        let value = req.headers().get("traceparent")?.to_str().ok()?;
        Self::parse(value)
    }
}
