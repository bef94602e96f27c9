//! HTTP transport
//!
//! Binds a parsed connection string to an [`HttpClient`], and (when async
//! writes are enabled) to a write queue drained by an
//! [`AsyncWriteReconciler`].
//!
//! # Example
//!
//! ```no_run
//! use fluxline_infra::HttpTransport;
//!
//! # async fn example() -> fluxline_domain::Result<()> {
//! let transport = HttpTransport::with_async("http://localhost:8086?db=telemetry")?;
//!
//! transport.create_database().await?;
//! transport.send_async("cpu,host=a value=0.64")?;
//! let body = transport.query("SELECT * FROM cpu").await?;
//!
//! transport.shutdown().await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fluxline_core::{Transport, WriteErrorHandler};
use fluxline_domain::constants::{
    DATABASE_PARAM, QUERY_PARAM, QUERY_PATH, WRITE_CONTENT_TYPE, WRITE_PATH,
};
use fluxline_domain::{
    BasicAuth, EndpointConfig, FluxlineError, Proxy, Result, TransportConfig,
};
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::http::{HttpClient, HttpClientBuilder};
use crate::observability::log_metric;
use crate::observability::metrics::WriteMetrics;
use crate::writer::{
    AsyncWriteReconciler, EnqueueError, LoggingErrorHandler, ReconcilerConfig, ReconcilerState,
    WriteQueue,
};

/// Transport that talks to the `/query` and `/write` endpoints over HTTP.
pub struct HttpTransport {
    endpoint: EndpointConfig,
    query_url: String,
    write_url: String,
    client: Arc<HttpClient>,
    queue: Arc<WriteQueue>,
    reconciler: AsyncWriteReconciler,
    metrics: Arc<WriteMetrics>,
}

impl HttpTransport {
    pub fn builder(url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder::new(url)
    }

    /// Synchronous operations only.
    pub fn new(url: &str) -> Result<Self> {
        Self::builder(url).build()
    }

    /// Synchronous operations plus `send_async`, backed by a running
    /// reconciler.
    pub fn with_async(url: &str) -> Result<Self> {
        Self::builder(url).async_writes(true).build()
    }

    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        let mut builder = Self::builder(config.url.as_str())
            .async_writes(config.async_writes)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .verify_tls(config.verify_tls)
            .poll_interval(config.poll_interval())
            .join_timeout(config.join_timeout())
            .queue_capacity(config.queue_capacity);

        if let Some(auth) = &config.auth {
            builder = builder.basic_auth(auth.clone());
        }
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(proxy.clone());
        }

        builder.build()
    }

    /// Run a query against `/query` and return the response body.
    pub async fn query(&self, query: &str) -> Result<String> {
        self.client
            .get(&self.query_url, &[(DATABASE_PARAM, self.database_name()), (QUERY_PARAM, query)])
            .await
    }

    /// Run a command against `/query` and return the response body.
    pub async fn execute(&self, cmd: &str) -> Result<String> {
        self.client
            .get(&self.query_url, &[(DATABASE_PARAM, self.database_name()), (QUERY_PARAM, cmd)])
            .await
    }

    /// POST line protocol to `/write` and wait for the server's answer.
    pub async fn write(&self, lineprotocol: impl Into<String>) -> Result<()> {
        self.client
            .post(
                &self.write_url,
                &[(DATABASE_PARAM, self.database_name())],
                &[("Content-Type", WRITE_CONTENT_TYPE)],
                lineprotocol,
            )
            .await
            .map(|_| ())
    }

    /// Start a write and return immediately.
    ///
    /// The outcome is reconciled in the background; failures reach the
    /// configured `WriteErrorHandler`, never the caller. Errors returned here
    /// are about accepting the write: async writes disabled or shut down, the
    /// queue at capacity, or a request that could not be built.
    pub fn send_async(&self, lineprotocol: impl Into<String>) -> Result<()> {
        match self.reconciler.state() {
            ReconcilerState::Running => {}
            ReconcilerState::Idle => {
                return Err(FluxlineError::Unsupported(
                    "asynchronous writes are not enabled for this transport".into(),
                ));
            }
            ReconcilerState::Stopping | ReconcilerState::Stopped => {
                return Err(FluxlineError::Worker("transport is shut down".into()));
            }
        }

        if let Some(capacity) = self.queue.capacity().filter(|_| self.queue.is_full()) {
            log_metric(self.metrics.record_rejected(), "transport.write.rejected");
            return Err(FluxlineError::QueueFull { capacity });
        }

        let pending = self.client.post_async(
            &self.write_url,
            &[(DATABASE_PARAM, self.database_name())],
            &[("Content-Type", WRITE_CONTENT_TYPE)],
            lineprotocol,
        )?;

        match self.queue.enqueue(pending) {
            Ok(()) => {
                log_metric(self.metrics.record_submitted(), "transport.write.submitted");
                Ok(())
            }
            // Lost a race for the last slot, or shutdown closed the queue.
            Err(EnqueueError::Full { pending, capacity }) => {
                debug!(sequence = pending.sequence(), capacity, "write queue filled up; aborting write");
                pending.abort();
                log_metric(self.metrics.record_rejected(), "transport.write.rejected");
                Err(FluxlineError::QueueFull { capacity })
            }
            Err(rejected @ EnqueueError::Closed { .. }) => {
                let pending = rejected.into_pending();
                debug!(sequence = pending.sequence(), "write queue closed; aborting write");
                pending.abort();
                Err(FluxlineError::Worker("transport is shut down".into()))
            }
        }
    }

    /// POST `CREATE DATABASE <name>` to `/query`.
    pub async fn create_database(&self) -> Result<()> {
        let statement = format!("CREATE DATABASE {}", self.database_name());
        self.client
            .post(&self.query_url, &[(QUERY_PARAM, statement.as_str())], &[], String::new())
            .await
            .map(|_| ())
    }

    pub fn set_basic_authentication(&self, user: &str, password: &str) {
        self.client.set_basic_auth(user, password);
    }

    pub fn set_proxy(&self, proxy: &Proxy) -> Result<()> {
        self.client.set_proxy(proxy)
    }

    /// Stop accepting async writes and wait until every queued write is
    /// resolved. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<()> {
        self.reconciler.shutdown().await
    }

    /// Async writes accepted but not yet taken by the reconciler.
    pub fn pending_writes(&self) -> usize {
        self.queue.len()
    }

    pub fn metrics(&self) -> &WriteMetrics {
        &self.metrics
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    pub fn database_name(&self) -> &str {
        self.endpoint.database_name()
    }

    pub fn reconciler_state(&self) -> ReconcilerState {
        self.reconciler.state()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, lineprotocol: String) -> Result<()> {
        HttpTransport::write(self, lineprotocol).await
    }

    async fn query(&self, query: &str) -> Result<String> {
        HttpTransport::query(self, query).await
    }

    async fn execute(&self, cmd: &str) -> Result<String> {
        HttpTransport::execute(self, cmd).await
    }

    async fn create_database(&self) -> Result<()> {
        HttpTransport::create_database(self).await
    }

    fn set_basic_authentication(&self, user: &str, password: &str) -> Result<()> {
        HttpTransport::set_basic_authentication(self, user, password);
        Ok(())
    }

    fn set_proxy(&self, proxy: &Proxy) -> Result<()> {
        HttpTransport::set_proxy(self, proxy)
    }
}

/// Builder for [`HttpTransport`].
pub struct HttpTransportBuilder {
    url: String,
    async_writes: bool,
    client: HttpClientBuilder,
    reconciler: ReconcilerConfig,
    queue_capacity: Option<usize>,
    error_handler: Option<Arc<dyn WriteErrorHandler>>,
}

impl HttpTransportBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            async_writes: false,
            client: HttpClient::builder(),
            reconciler: ReconcilerConfig::default(),
            queue_capacity: None,
            error_handler: None,
        }
    }

    /// Start the background reconciler so `send_async` is available.
    pub fn async_writes(mut self, enabled: bool) -> Self {
        self.async_writes = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.timeout(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.connect_timeout(timeout);
        self
    }

    pub fn verify_tls(mut self, enabled: bool) -> Self {
        self.client = self.client.verify_tls(enabled);
        self
    }

    pub fn basic_auth(mut self, auth: BasicAuth) -> Self {
        self.client = self.client.basic_auth(auth);
        self
    }

    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.client = self.client.proxy(proxy);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.client = self.client.user_agent(agent);
        self
    }

    /// Runtime for async requests and the reconciler task.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.client = self.client.runtime(handle);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.reconciler.poll_interval = interval;
        self
    }

    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.reconciler.join_timeout = timeout;
        self
    }

    /// Maximum number of unresolved async writes. `None` (the default)
    /// leaves the queue unbounded.
    pub fn queue_capacity(mut self, capacity: Option<usize>) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Receive failed async writes. Defaults to [`LoggingErrorHandler`].
    pub fn error_handler(mut self, handler: Arc<dyn WriteErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<HttpTransport> {
        let endpoint = EndpointConfig::parse(&self.url)?;
        let client = Arc::new(self.client.build()?);
        let queue = Arc::new(WriteQueue::with_capacity(self.queue_capacity));
        let metrics = Arc::new(WriteMetrics::new());
        let handler = self.error_handler.unwrap_or_else(|| Arc::new(LoggingErrorHandler));

        let reconciler = AsyncWriteReconciler::new(
            Arc::clone(&queue),
            handler,
            self.reconciler,
            Arc::clone(&metrics),
        );
        if self.async_writes {
            reconciler.start_on(client.runtime())?;
        }

        info!(
            endpoint = %endpoint.endpoint_url(),
            database = %endpoint.database_name(),
            async_writes = self.async_writes,
            "HTTP transport ready"
        );

        Ok(HttpTransport {
            query_url: endpoint.url_for(QUERY_PATH),
            write_url: endpoint.url_for(WRITE_PATH),
            endpoint,
            client,
            queue,
            reconciler,
            metrics,
        })
    }
}
