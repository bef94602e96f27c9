//! Write-path metrics for synchronous and asynchronous writes
//!
//! Counts what happens to every write a transport accepts: submitted to the
//! queue, rejected by a full queue, resolved as success or failure by the
//! reconciler. Wait time is the span between submission and resolution of
//! an asynchronous write.
//!
//! ## Design
//! - **SeqCst ordering** for the wait-time pair used in the average
//! - **Relaxed ordering** for independent counters
//! - **Microsecond storage**, reporting helpers convert to ms

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::observability::{MetricsError, MetricsResult};

/// Metrics for the asynchronous write path
#[derive(Debug, Default)]
pub struct WriteMetrics {
    /// Writes accepted into the queue
    pub submitted: AtomicUsize,
    /// Writes refused because the queue was full
    pub rejected: AtomicUsize,
    /// Writes resolved successfully
    pub succeeded: AtomicUsize,
    /// Writes resolved with an error
    pub failed: AtomicUsize,
    /// Completed drain passes of the reconciler
    pub drain_passes: AtomicUsize,
    /// Total wait time of resolved writes in microseconds
    pub total_wait_time_micros: AtomicU64,
    /// Wait time of the most recently resolved write in microseconds
    pub last_wait_time_micros: AtomicU64,
    /// Number of wait times recorded
    pub wait_count: AtomicUsize,
}

/// Point-in-time copy of [`WriteMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteMetricsSnapshot {
    pub submitted: usize,
    pub rejected: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub drain_passes: usize,
}

impl WriteMetricsSnapshot {
    /// Writes accepted but not yet resolved.
    pub const fn in_flight(&self) -> usize {
        self.submitted.saturating_sub(self.succeeded + self.failed)
    }
}

impl WriteMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) -> MetricsResult<()> {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_rejected(&self) -> MetricsResult<()> {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_success(&self) -> MetricsResult<()> {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_failure(&self) -> MetricsResult<()> {
        self.failed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_drain_pass(&self) -> MetricsResult<()> {
        self.drain_passes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Record how long a write waited between submission and resolution.
    ///
    /// Fails with [`MetricsError::OutOfRange`] for durations that do not fit
    /// in a `u64` of microseconds.
    pub fn record_wait_time(&self, duration: Duration) -> MetricsResult<()> {
        let micros = u64::try_from(duration.as_micros())
            .map_err(|_| MetricsError::OutOfRange { metric: "write.wait_time" })?;

        // SeqCst for consistency with avg_wait_time calculation
        self.total_wait_time_micros.fetch_add(micros, Ordering::SeqCst);
        self.wait_count.fetch_add(1, Ordering::SeqCst);

        self.last_wait_time_micros.store(micros, Ordering::Relaxed);

        Ok(())
    }

    /// Average wait time of resolved writes.
    pub fn avg_wait_time(&self) -> MetricsResult<Duration> {
        let total = self.total_wait_time_micros.load(Ordering::SeqCst);
        let count = self.wait_count.load(Ordering::SeqCst) as u64;

        if count == 0 {
            return Err(MetricsError::EmptyData { metric: "average wait" });
        }

        Ok(Duration::from_micros(total / count))
    }

    pub fn last_wait_time_ms(&self) -> u64 {
        self.last_wait_time_micros.load(Ordering::Relaxed) / 1_000
    }

    pub fn total_wait_time_ms(&self) -> u64 {
        self.total_wait_time_micros.load(Ordering::SeqCst) / 1_000
    }

    pub fn snapshot(&self) -> WriteMetricsSnapshot {
        WriteMetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            drain_passes: self.drain_passes.load(Ordering::Relaxed),
        }
    }
}
