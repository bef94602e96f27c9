//! Infrastructure error plumbing

mod conversions;

pub use conversions::{status_error, InfraError};
