//! Ingestion gateway service - supervisor for the ingest and admin listeners.
//!
//! Startup: ping the directory, start the confirmation loop and stale sweep,
//! bind the listeners. Shutdown: stop accepting requests, flush the
//! publisher, close the producer, wait for the confirmation loop to drain,
//! release the directory.

use crate::domain::config::IngestConfig;
use crate::domain::error::GatewayError;
use crate::ingest::handler::{handle_ingest, IngestionHandler};
use crate::ingest::validation::PayloadValidator;
use crate::middleware::{IngestMetrics, TimeoutLayer, TracingLayer};
use crate::ports::directory::DirectoryClient;
use crate::publisher::{confirmation_loop, sweep_task, DeliveryTracker, EventPublisher};
use axum::{
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use ingest_bus::BusProducer;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

/// Background tasks owned by a running service
struct BackgroundTasks {
    confirmation: JoinHandle<()>,
    sweep: JoinHandle<()>,
}

/// Ingestion gateway service
pub struct IngestGatewayService {
    config: IngestConfig,
    directory: Arc<dyn DirectoryClient>,
    publisher: Arc<EventPublisher>,
    handler: Arc<IngestionHandler>,
    metrics: Arc<IngestMetrics>,
    shutdown_tx: watch::Sender<bool>,
}

impl IngestGatewayService {
    /// Create the service. Handles are injected and shared for the process lifetime.
    pub fn new(
        config: IngestConfig,
        directory: Arc<dyn DirectoryClient>,
        producer: Arc<dyn BusProducer>,
        validator: Arc<dyn PayloadValidator>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;

        let tracker = Arc::new(DeliveryTracker::new(config.delivery.confirm_timeout));
        let publisher = Arc::new(EventPublisher::new(producer, tracker));
        let metrics = Arc::new(IngestMetrics::new());

        let handler = Arc::new(IngestionHandler::new(
            Arc::clone(&directory),
            validator,
            Arc::clone(&publisher),
            Arc::clone(&metrics),
            &config,
        ));

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            directory,
            publisher,
            handler,
            metrics,
            shutdown_tx,
        })
    }

    /// Bind the configured addresses and serve until [`shutdown`](Self::shutdown).
    pub async fn run(&self) -> Result<(), GatewayError> {
        self.check_directory().await?;
        let tasks = self.start_background_tasks()?;

        let listeners = async {
            let http = bind(self.config.http_addr()).await?;
            let admin = if self.config.admin.enabled {
                Some(bind(self.config.admin_addr()).await?)
            } else {
                None
            };
            Ok::<_, GatewayError>((http, admin))
        };

        match listeners.await {
            Ok((http, admin)) => self.serve_until_shutdown(http, admin, tasks).await,
            Err(err) => {
                self.drain(tasks).await;
                Err(err)
            }
        }
    }

    /// Serve on already-bound listeners until [`shutdown`](Self::shutdown).
    pub async fn serve(
        &self,
        http: TcpListener,
        admin: Option<TcpListener>,
    ) -> Result<(), GatewayError> {
        self.check_directory().await?;
        let tasks = self.start_background_tasks()?;
        self.serve_until_shutdown(http, admin, tasks).await
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<IngestMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Get the delivery tracker
    pub fn tracker(&self) -> Arc<DeliveryTracker> {
        self.publisher.tracker()
    }

    /// Get configuration
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Build the ingest router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", any(handle_ingest))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.config.limits.max_request_size))
            .layer(
                TimeoutLayer::new(self.config.timeouts.request)
                    .with_metrics(Arc::clone(&self.metrics)),
            )
            .layer(TracingLayer::new())
            .with_state(Arc::clone(&self.handler))
    }

    /// Build the admin router
    pub fn admin_router(&self) -> Router {
        let state = AdminState {
            metrics: Arc::clone(&self.metrics),
            tracker: self.publisher.tracker(),
            publisher: Arc::clone(&self.publisher),
        };

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/metrics", get(metrics_json))
            .route("/deliveries", get(deliveries));

        #[cfg(feature = "metrics")]
        let router = router.route("/metrics/prometheus", get(metrics_prometheus));

        router.with_state(state)
    }

    async fn check_directory(&self) -> Result<(), GatewayError> {
        let ping = tokio::time::timeout(self.config.timeouts.directory, self.directory.ping())
            .await
            .map_err(|_| {
                GatewayError::DirectoryUnavailable(format!(
                    "ping timed out after {:?}",
                    self.config.timeouts.directory
                ))
            })?;

        ping.map_err(|e| {
            error!(error = %e, "Directory unreachable at startup");
            GatewayError::DirectoryUnavailable(e.to_string())
        })?;

        info!("Directory reachable");
        Ok(())
    }

    fn start_background_tasks(&self) -> Result<BackgroundTasks, GatewayError> {
        let reports = self.publisher.take_delivery_reports().ok_or_else(|| {
            GatewayError::Internal("delivery reports already taken; service started twice".into())
        })?;

        let confirmation = tokio::spawn(confirmation_loop(
            reports,
            self.publisher.tracker(),
            Arc::clone(&self.metrics),
        ));
        let sweep = tokio::spawn(sweep_task(
            self.publisher.tracker(),
            self.config.delivery.sweep_interval,
        ));

        Ok(BackgroundTasks {
            confirmation,
            sweep,
        })
    }

    async fn serve_until_shutdown(
        &self,
        http: TcpListener,
        admin: Option<TcpListener>,
        tasks: BackgroundTasks,
    ) -> Result<(), GatewayError> {
        let admin_handle = admin.map(|listener| {
            log_listening("admin", &listener);
            let router = self.admin_router();
            let signal = self.shutdown_signal();
            tokio::spawn(async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(signal)
                    .await
            })
        });

        log_listening("ingest", &http);
        info!("Ingestion gateway started");

        let served = axum::serve(http, self.router())
            .with_graceful_shutdown(self.shutdown_signal())
            .await;

        // The ingest listener may have failed on its own; take the admin one down too.
        self.shutdown();
        if let Some(handle) = admin_handle {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Admin server error"),
                Err(e) => warn!(error = %e, "Admin server task failed"),
            }
        }

        info!("Listeners stopped, draining publisher");
        self.drain(tasks).await;
        info!("Ingestion gateway stopped");

        served.map_err(|e| GatewayError::Serve(e.to_string()))
    }

    async fn drain(&self, tasks: BackgroundTasks) {
        let flush_timeout = self.config.bus.flush_timeout;

        if let Err(e) = self.publisher.flush(flush_timeout).await {
            warn!(error = %e, "Flush incomplete, remaining messages will be purged");
        }
        self.publisher.close();

        match tokio::time::timeout(flush_timeout, tasks.confirmation).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Confirmation loop failed"),
            Err(_) => warn!("Confirmation loop did not finish before the flush timeout"),
        }
        tasks.sweep.abort();

        let snapshot = self.publisher.tracker().snapshot();
        info!(
            delivered = snapshot.delivered,
            failed = snapshot.failed,
            unconfirmed = snapshot.unconfirmed + snapshot.in_flight as u64,
            "Publisher drained"
        );

        self.directory.close().await;
    }

    fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown_tx.subscribe();
        async move {
            // Sender lives as long as the service; an error means it is gone.
            let _ = rx.wait_for(|stop| *stop).await;
        }
    }
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, GatewayError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))
}

fn log_listening(name: &str, listener: &TcpListener) {
    match listener.local_addr() {
        Ok(addr) => info!(listener = name, addr = %addr, "Listening"),
        Err(e) => warn!(listener = name, error = %e, "Listening on unknown address"),
    }
}

/// Admin listener state
#[derive(Clone)]
struct AdminState {
    metrics: Arc<IngestMetrics>,
    tracker: Arc<DeliveryTracker>,
    publisher: Arc<EventPublisher>,
}

async fn health_check(State(state): State<AdminState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "ingest-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "in_flight": state.publisher.in_flight(),
    }))
}

async fn metrics_json(State(state): State<AdminState>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}

#[cfg(feature = "metrics")]
async fn metrics_prometheus(State(state): State<AdminState>) -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        state.metrics.to_prometheus(),
    )
}

async fn deliveries(State(state): State<AdminState>) -> impl IntoResponse {
    Json(state.tracker.snapshot())
}
