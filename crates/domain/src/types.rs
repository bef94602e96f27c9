//! Credential and proxy types

use std::fmt;

use serde::{Deserialize, Serialize};

/// HTTP basic-auth credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl BasicAuth {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self { user: user.into(), password: password.into() }
    }
}

// Keep passwords out of logs.
impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth").field("user", &self.user).field("password", &"***").finish()
    }
}

/// Credentials presented to a proxy.
pub type ProxyAuthentication = BasicAuth;

/// Proxy used for both `http` and `https` targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authentication: Option<ProxyAuthentication>,
}

impl Proxy {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), authentication: None }
    }

    pub fn with_authentication(url: impl Into<String>, auth: ProxyAuthentication) -> Self {
        Self { url: url.into(), authentication: Some(auth) }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub const fn authentication(&self) -> Option<&ProxyAuthentication> {
        self.authentication.as_ref()
    }
}
