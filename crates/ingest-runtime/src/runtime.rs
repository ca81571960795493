//! Process wiring: builds the long-lived handles and runs the gateway.

use anyhow::{Context, Result};
use ingest_bus::InMemoryLog;
use ingest_gateway::{
    IngestConfig, IngestGatewayService, InMemoryDirectory, JsonValidator,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

/// The running process: directory, event log and gateway service.
pub struct IngestRuntime {
    service: Arc<IngestGatewayService>,
    log: Arc<InMemoryLog>,
}

impl IngestRuntime {
    /// Build every component from `config`. Must be called inside a tokio runtime.
    pub fn new(config: IngestConfig) -> Result<Self> {
        let directory = match &config.directory.seed_path {
            Some(path) => InMemoryDirectory::from_json_file(path)
                .with_context(|| format!("Failed to load directory seed {}", path.display()))?,
            None => {
                warn!("No directory seed configured, every request will be refused");
                InMemoryDirectory::new()
            }
        };

        let log = InMemoryLog::start(config.log_config());
        info!(
            topic = %config.bus.topic,
            partitions = config.bus.partitions,
            capacity = config.bus.queue_capacity,
            "Event log started"
        );

        let service = IngestGatewayService::new(
            config,
            Arc::new(directory),
            log.clone(),
            Arc::new(JsonValidator),
        )
        .context("Failed to create gateway service")?;

        Ok(Self {
            service: Arc::new(service),
            log,
        })
    }

    /// Serve until `signal` completes, then shut down gracefully.
    pub async fn run_until<F>(&self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let watcher = tokio::spawn(async move {
            signal.await;
            info!("Initiating graceful shutdown...");
            service.shutdown();
        });

        let result = self.service.run().await;
        watcher.abort();

        info!(records = self.log.appended(), "Shutdown complete");
        result.context("Gateway stopped with an error")
    }

    /// Gateway service handle.
    pub fn service(&self) -> Arc<IngestGatewayService> {
        Arc::clone(&self.service)
    }

    /// Event log handle.
    pub fn log(&self) -> Arc<InMemoryLog> {
        Arc::clone(&self.log)
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
