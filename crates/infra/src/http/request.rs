//! HTTP requests described as plain data.
//!
//! A [`RequestSpec`] is built for every operation before anything touches the
//! network. The client turns it into a `reqwest` request together with the
//! session settings that are current at that moment, which keeps request
//! construction testable without a server.

use fluxline_domain::BasicAuth;
use reqwest::{Client as ReqwestClient, RequestBuilder};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub url: String,
    /// Query string parameters, in order.
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self { method: HttpMethod::Post, ..Self::get(url) }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params.extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach this request to `client`, applying `auth` when present.
    pub(crate) fn into_builder(
        self,
        client: &ReqwestClient,
        auth: Option<&BasicAuth>,
    ) -> RequestBuilder {
        let mut builder = client.request(self.method.as_reqwest(), &self.url);

        if !self.params.is_empty() {
            builder = builder.query(&self.params);
        }

        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(auth) = auth {
            builder = builder.basic_auth(&auth.user, Some(&auth.password));
        }

        if let Some(body) = self.body {
            builder = builder.body(body);
        }

        builder
    }
}
