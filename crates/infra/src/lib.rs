//! # Fluxline Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - The `reqwest`-backed HTTP client adapter
//! - The async write queue and its background reconciler
//! - `HttpTransport`, which ties both to a parsed endpoint
//! - Configuration loading and write metrics
//!
//! ## Architecture
//! - Implements traits defined in `fluxline-core`
//! - Depends on `fluxline-domain` and `fluxline-core`
//! - Contains all "impure" code (network, runtime, environment)

pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod transport;
pub mod writer;

// Re-export commonly used items
pub use http::{HttpClient, HttpClientBuilder};
pub use transport::{HttpTransport, HttpTransportBuilder};
pub use writer::{
    AsyncWriteReconciler, ChannelErrorHandler, LoggingErrorHandler, PendingWrite,
    ReconcilerConfig, ReconcilerState, WriteQueue,
};
