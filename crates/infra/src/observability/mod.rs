//! Observability for the write path
//!
//! Metrics are plain atomic counters owned by a transport and shared with its
//! reconciler. Logging goes through `tracing` at the call sites.
//!
//! ## Error Handling
//!
//! Record methods return `MetricsResult<()>`. Callers log failures and carry
//! on; a metric that cannot be recorded is dropped.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use fluxline_infra::observability::metrics::WriteMetrics;
//!
//! let metrics = WriteMetrics::new();
//!
//! if let Err(e) = metrics.record_wait_time(Duration::from_millis(3)) {
//!     tracing::warn!("Failed to record metric: {}", e);
//! }
//! ```

pub mod metrics;

/// Metrics error type
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Empty data set - cannot calculate aggregate metric
    #[error("Empty data: cannot calculate {metric}")]
    EmptyData {
        /// Metric name that failed (e.g., "average wait")
        metric: &'static str,
    },

    /// Recorded value does not fit the counter
    #[error("Value out of range for metric '{metric}'")]
    OutOfRange {
        /// Metric name
        metric: &'static str,
    },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Log a metric that failed to record and carry on.
pub(crate) fn log_metric(result: MetricsResult<()>, metric: &'static str) {
    if let Err(err) = result {
        tracing::warn!(metric = metric, error = ?err, "Failed to record write metric");
    }
}
