//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_JOIN_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_TIMEOUT_SECS, DEFAULT_VERIFY_TLS,
};
use crate::types::{BasicAuth, Proxy};

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Connection string, `scheme://host[:port]/path?db=NAME`
    pub url: String,
    /// Start the background reconciler for `send_async`
    #[serde(default)]
    pub async_writes: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Verify server certificates. Off unless explicitly enabled.
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_join_timeout_secs")]
    pub join_timeout_secs: u64,
    /// Maximum outstanding async writes; `None` leaves the queue unbounded.
    #[serde(default)]
    pub queue_capacity: Option<usize>,
    #[serde(default)]
    pub auth: Option<BasicAuth>,
    #[serde(default)]
    pub proxy: Option<Proxy>,
}

impl TransportConfig {
    /// Configuration with defaults for everything but the connection string.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            async_writes: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            verify_tls: DEFAULT_VERIFY_TLS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            join_timeout_secs: DEFAULT_JOIN_TIMEOUT_SECS,
            queue_capacity: None,
            auth: None,
            proxy: None,
        }
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

const fn default_verify_tls() -> bool {
    DEFAULT_VERIFY_TLS
}

const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

const fn default_join_timeout_secs() -> u64 {
    DEFAULT_JOIN_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_uses_defaults() {
        let config: TransportConfig =
            serde_json::from_str(r#"{ "url": "http://localhost:8086/?db=test" }"#).unwrap();

        assert_eq!(config, TransportConfig::new("http://localhost:8086/?db=test"));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert!(!config.verify_tls);
        assert!(!config.async_writes);
        assert!(config.queue_capacity.is_none());
    }

    #[test]
    fn toml_with_auth_and_proxy() {
        let config: TransportConfig = toml::from_str(
            r#"
url = "http://tsdb:8086/?db=metrics"
async_writes = true
queue_capacity = 512

[auth]
user = "writer"
password = "secret"

[proxy]
url = "http://proxy:3128"
"#,
        )
        .unwrap();

        assert!(config.async_writes);
        assert_eq!(config.queue_capacity, Some(512));
        assert_eq!(config.auth, Some(BasicAuth::new("writer", "secret")));
        assert_eq!(config.proxy.as_ref().map(Proxy::url), Some("http://proxy:3128"));
    }
}
