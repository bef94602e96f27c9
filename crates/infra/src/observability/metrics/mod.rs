//! Metrics collection modules

pub mod write;

pub use write::{WriteMetrics, WriteMetricsSnapshot};
