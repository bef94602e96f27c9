//! Port interface for database transports

use async_trait::async_trait;
use fluxline_domain::{FluxlineError, Proxy, Result};

/// A channel that carries line protocol writes and queries to the database.
///
/// Only `send` is mandatory. The remaining operations default to
/// `FluxlineError::Unsupported` so transports that cannot query (UDP, unix
/// sockets) implement just what they offer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write a line protocol payload and wait for the server to accept it.
    async fn send(&self, lineprotocol: String) -> Result<()>;

    /// Run a query and return the raw response body.
    async fn query(&self, _query: &str) -> Result<String> {
        Err(unsupported("query"))
    }

    /// Run an administrative command and return the raw response body.
    async fn execute(&self, _cmd: &str) -> Result<String> {
        Err(unsupported("execute"))
    }

    /// Create the database named in the connection string.
    async fn create_database(&self) -> Result<()> {
        Err(unsupported("create_database"))
    }

    /// Apply basic-auth credentials to subsequent requests.
    fn set_basic_authentication(&self, _user: &str, _password: &str) -> Result<()> {
        Err(unsupported("set_basic_authentication"))
    }

    /// Route subsequent requests through a proxy.
    fn set_proxy(&self, _proxy: &Proxy) -> Result<()> {
        Err(unsupported("set_proxy"))
    }
}

fn unsupported(operation: &str) -> FluxlineError {
    tracing::debug!(operation, "transport operation not supported");
    FluxlineError::Unsupported(format!("{operation} is not supported by this transport"))
}
