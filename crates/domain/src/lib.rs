//! # Fluxline Domain
//!
//! Domain types shared by every Fluxline crate.
//!
//! This crate contains:
//! - The error taxonomy and `Result` alias
//! - Endpoint parsing (`scheme://host[:port]/path?db=NAME`)
//! - Transport configuration structures
//! - Credential and proxy types
//! - Protocol constants
//!
//! ## Architecture
//! - No dependencies on other Fluxline crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod endpoint;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use endpoint::EndpointConfig;
pub use errors::*;
pub use types::*;
