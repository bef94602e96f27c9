//! # Fluxline Core
//!
//! Port interfaces for the transport layer - no HTTP code.
//!
//! This crate contains:
//! - The `Transport` port every transport implements
//! - The `WriteErrorHandler` port the async reconciler reports failures to
//!
//! ## Architecture Principles
//! - Only depends on `fluxline-domain`
//! - No network or runtime code
//! - All external dependencies via traits

pub mod transport_ports;
pub mod write_ports;

pub use transport_ports::Transport;
pub use write_ports::{WriteErrorHandler, WriteFailure};
