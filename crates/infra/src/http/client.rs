use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use fluxline_domain::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, DEFAULT_VERIFY_TLS,
};
use fluxline_domain::{BasicAuth, FluxlineError, Proxy, Result};
use parking_lot::RwLock;
use reqwest::{Client as ReqwestClient, Request, Response};
use tokio::runtime::Handle;
use tracing::debug;

use crate::errors::{status_error, InfraError};
use crate::http::request::RequestSpec;
use crate::writer::PendingWrite;

/// Settings applied to every request built by an [`HttpClient`].
#[derive(Debug, Clone, Default)]
struct SessionSettings {
    auth: Option<BasicAuth>,
    proxy: Option<Proxy>,
}

/// HTTP client adapter shared by callers and the write reconciler.
///
/// One `reqwest` session is reused for every request. Authentication and
/// proxy settings can change at any time; each request copies the settings
/// that are current when it is built, so a setter never alters a request that
/// is already on its way.
pub struct HttpClient {
    client: RwLock<ReqwestClient>,
    session: RwLock<SessionSettings>,
    options: ClientOptions,
    runtime: Handle,
    next_sequence: AtomicU64,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Perform a GET round trip and return the response body.
    pub async fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<String> {
        let spec = RequestSpec::get(url).params(params.iter().copied());
        self.execute(spec).await
    }

    /// Perform a POST round trip and return the response body.
    pub async fn post(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
        body: impl Into<String>,
    ) -> Result<String> {
        let spec = post_spec(url, params, headers, body);
        self.execute(spec).await
    }

    /// Start a POST without waiting for it.
    ///
    /// The request is built before this returns, then sent on the client's
    /// runtime. The returned [`PendingWrite`] resolves to the classified
    /// outcome.
    pub fn post_async(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
        body: impl Into<String>,
    ) -> Result<PendingWrite> {
        let (client, request) = self.prepare(post_spec(url, params, headers, body))?;
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);

        debug!(sequence, method = %request.method(), url = %request.url(), "dispatching async HTTP request");
        let handle = self.runtime.spawn(async move {
            check_response(client.execute(request).await).await.map(|_| ())
        });

        Ok(PendingWrite::from_handle(sequence, handle))
    }

    /// Execute a request described by `spec` and return the response body.
    pub async fn execute(&self, spec: RequestSpec) -> Result<String> {
        let (client, request) = self.prepare(spec)?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        let result = check_response(client.execute(request).await).await;
        match &result {
            Ok(_) => debug!(%method, %url, "HTTP request succeeded"),
            Err(err) => debug!(%method, %url, error = %err, "HTTP request failed"),
        }
        result
    }

    /// Use basic authentication for every request built from now on.
    pub fn set_basic_auth(&self, user: &str, password: &str) {
        self.session.write().auth = Some(BasicAuth::new(user, password));
    }

    /// Route every request built from now on through `proxy`, for both
    /// `http` and `https` targets.
    pub fn set_proxy(&self, proxy: &Proxy) -> Result<()> {
        let client = self.options.build_client(Some(proxy))?;

        *self.client.write() = client;
        self.session.write().proxy = Some(proxy.clone());
        debug!(proxy = %proxy.url(), "proxy configured");
        Ok(())
    }

    pub fn proxy(&self) -> Option<Proxy> {
        self.session.read().proxy.clone()
    }

    pub fn has_basic_auth(&self) -> bool {
        self.session.read().auth.is_some()
    }

    /// Runtime that asynchronous requests are spawned on.
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Snapshot the session and build the request.
    fn prepare(&self, spec: RequestSpec) -> Result<(ReqwestClient, Request)> {
        let client = self.client.read().clone();
        let auth = self.session.read().auth.clone();

        let request = spec.into_builder(&client, auth.as_ref()).build().map_err(into_domain)?;
        Ok((client, request))
    }
}

fn post_spec(
    url: &str,
    params: &[(&str, &str)],
    headers: &[(&str, &str)],
    body: impl Into<String>,
) -> RequestSpec {
    RequestSpec::post(url)
        .params(params.iter().copied())
        .headers(headers.iter().copied())
        .body(body)
}

/// Classify a completed round trip.
///
/// Transport failures become [`FluxlineError::Request`], non-2xx statuses
/// become [`FluxlineError::Status`]; otherwise the body is returned.
pub async fn check_response(
    result: std::result::Result<Response, reqwest::Error>,
) -> Result<String> {
    let response = result.map_err(into_domain)?;
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status));
    }
    response.text().await.map_err(into_domain)
}

fn into_domain(err: reqwest::Error) -> FluxlineError {
    let infra: InfraError = err.into();
    FluxlineError::from(infra)
}

#[derive(Debug, Clone)]
struct ClientOptions {
    timeout: Duration,
    connect_timeout: Duration,
    verify_tls: bool,
    user_agent: Option<String>,
}

impl ClientOptions {
    fn build_client(&self, proxy: Option<&Proxy>) -> Result<ReqwestClient> {
        let mut builder = ReqwestClient::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .danger_accept_invalid_certs(!self.verify_tls);

        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent);
        }

        builder = match proxy {
            Some(proxy) => {
                let mut reqwest_proxy = reqwest::Proxy::all(proxy.url()).map_err(into_domain)?;
                if let Some(auth) = proxy.authentication() {
                    reqwest_proxy = reqwest_proxy.basic_auth(&auth.user, &auth.password);
                }
                builder.proxy(reqwest_proxy)
            }
            // Only explicitly configured proxies are used.
            None => builder.no_proxy(),
        };

        builder.build().map_err(into_domain)
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    connect_timeout: Duration,
    verify_tls: bool,
    user_agent: Option<String>,
    auth: Option<BasicAuth>,
    proxy: Option<Proxy>,
    runtime: Option<Handle>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            verify_tls: DEFAULT_VERIFY_TLS,
            user_agent: None,
            auth: None,
            proxy: None,
            runtime: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Verify server certificates. Disabled by default.
    pub fn verify_tls(mut self, enabled: bool) -> Self {
        self.verify_tls = enabled;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn basic_auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Spawn asynchronous requests on `handle` instead of the current runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|err| {
                FluxlineError::Internal(format!("no tokio runtime for HTTP client: {err}"))
            })?,
        };

        let options = ClientOptions {
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            verify_tls: self.verify_tls,
            user_agent: self.user_agent,
        };
        let client = options.build_client(self.proxy.as_ref())?;

        Ok(HttpClient {
            client: RwLock::new(client),
            session: RwLock::new(SessionSettings { auth: self.auth, proxy: self.proxy }),
            options,
            runtime,
            next_sequence: AtomicU64::new(1),
        })
    }
}
