//! Transports implementing the `fluxline_core::Transport` port

mod http;

pub use http::{HttpTransport, HttpTransportBuilder};
