//! Test harness: a gateway served on loopback listeners plus directory fakes.

use async_trait::async_trait;
use ingest_bus::InMemoryLog;
use ingest_gateway::ingest::API_TOKEN_PARAM;
use ingest_gateway::{
    DirectoryClient, DirectoryError, GatewayError, IngestConfig, IngestGatewayService,
    InMemoryDirectory, JsonValidator, SourceDocument, SourceRecord,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Token registered in [`seeded_directory`].
pub const TOKEN: &str = "abc123";
/// Name registered for [`TOKEN`].
pub const SOURCE_NAME: &str = "Zabbix";
/// Topic every test gateway publishes to.
pub const TOPIC: &str = "Events";

/// Defaults shortened for tests.
pub fn test_config() -> IngestConfig {
    let mut config = IngestConfig::default();
    config.timeouts.directory = Duration::from_millis(200);
    config.bus.flush_timeout = Duration::from_secs(2);
    config
}

/// Directory holding a single `abc123` / `Zabbix` source.
pub fn seeded_directory() -> Arc<InMemoryDirectory> {
    let directory = InMemoryDirectory::new();
    directory.insert(SourceDocument::new(TOKEN, SOURCE_NAME));
    Arc::new(directory)
}

/// Poll `check` every 10ms until it holds or `timeout` elapses.
pub async fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Status, selected headers and body of one response.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub content_type: Option<String>,
    pub retry_after: Option<String>,
    pub body: Vec<u8>,
}

impl Reply {
    async fn read(response: reqwest::Response) -> Self {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header("content-type");
        let retry_after = header("retry-after");
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .expect("read response body")
            .to_vec();

        Self {
            status,
            content_type,
            retry_after,
            body,
        }
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

/// A gateway serving on `127.0.0.1` with ephemeral ports.
pub struct TestGateway {
    pub service: Arc<IngestGatewayService>,
    pub log: Arc<InMemoryLog>,
    base_url: String,
    admin_url: String,
    client: reqwest::Client,
    running: JoinHandle<Result<(), GatewayError>>,
}

impl TestGateway {
    /// Seeded directory, default test config, running log.
    pub async fn start() -> Self {
        Self::start_with_config(test_config()).await
    }

    /// Seeded directory and running log with a custom config.
    pub async fn start_with_config(config: IngestConfig) -> Self {
        let log = InMemoryLog::start(config.log_config());
        Self::start_with(config, seeded_directory(), log).await
    }

    /// Fully custom gateway.
    pub async fn start_with(
        config: IngestConfig,
        directory: Arc<dyn DirectoryClient>,
        log: Arc<InMemoryLog>,
    ) -> Self {
        let service = Arc::new(
            IngestGatewayService::new(config, directory, log.clone(), Arc::new(JsonValidator))
                .expect("valid test config"),
        );

        let http = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ingest listener");
        let admin = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind admin listener");
        let base_url = format!("http://{}/", http.local_addr().expect("ingest addr"));
        let admin_url = format!("http://{}", admin.local_addr().expect("admin addr"));

        let running = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.serve(http, Some(admin)).await })
        };

        Self {
            service,
            log,
            base_url,
            admin_url,
            client: reqwest::Client::new(),
            running,
        }
    }

    /// `POST /?Api-Token=<token>` with `body`.
    pub async fn post(&self, token: &str, body: impl Into<Vec<u8>>) -> Reply {
        self.send(reqwest::Method::POST, Some(token), body).await
    }

    /// Any method, optional token.
    pub async fn send(
        &self,
        method: reqwest::Method,
        token: Option<&str>,
        body: impl Into<Vec<u8>>,
    ) -> Reply {
        let mut request = self.client.request(method, &self.base_url);
        if let Some(token) = token {
            request = request.query(&[(API_TOKEN_PARAM, token)]);
        }
        let response = request
            .body(body.into())
            .send()
            .await
            .expect("ingest request");
        Reply::read(response).await
    }

    /// `GET` an admin path and parse the JSON body.
    pub async fn admin_json(&self, path: &str) -> serde_json::Value {
        let response = self
            .client
            .get(format!("{}{}", self.admin_url, path))
            .send()
            .await
            .expect("admin request");
        Reply::read(response).await.json()
    }

    /// Trigger shutdown and wait for the drain to finish.
    pub async fn stop(self) -> Result<(), GatewayError> {
        self.service.shutdown();
        self.running.await.expect("gateway task panicked")
    }
}

/// Directory that can be taken down and brought back.
pub struct FlakyDirectory {
    inner: Arc<InMemoryDirectory>,
    down: AtomicBool,
}

impl FlakyDirectory {
    pub fn new(inner: Arc<InMemoryDirectory>) -> Self {
        Self {
            inner,
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DirectoryError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryClient for FlakyDirectory {
    async fn lookup(&self, token: &str) -> Result<Option<SourceRecord>, DirectoryError> {
        self.check()?;
        self.inner.lookup(token).await
    }

    async fn ping(&self) -> Result<(), DirectoryError> {
        self.check()?;
        self.inner.ping().await
    }
}

/// Directory that answers from `inner` after `delay`.
pub struct DelayedDirectory {
    pub inner: Arc<InMemoryDirectory>,
    pub delay: Duration,
}

impl DelayedDirectory {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: seeded_directory(),
            delay,
        }
    }
}

#[async_trait]
impl DirectoryClient for DelayedDirectory {
    async fn lookup(&self, token: &str) -> Result<Option<SourceRecord>, DirectoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.lookup(token).await
    }

    async fn ping(&self) -> Result<(), DirectoryError> {
        Ok(())
    }
}

/// Directory that resolves every token to a record with a different key.
pub struct MismatchedDirectory;

#[async_trait]
impl DirectoryClient for MismatchedDirectory {
    async fn lookup(&self, token: &str) -> Result<Option<SourceRecord>, DirectoryError> {
        Ok(Some(SourceRecord::from_document(
            token,
            SourceDocument::new("stored-key", "Impostor"),
        )))
    }

    async fn ping(&self) -> Result<(), DirectoryError> {
        Ok(())
    }
}
