//! Handles to in-flight asynchronous writes.

use std::future::Future;
use std::time::{Duration, Instant};

use fluxline_domain::{FluxlineError, Result};
use tokio::task::JoinHandle;

use crate::errors::InfraError;

/// An asynchronous write whose outcome is not yet known.
///
/// Consumed by [`PendingWrite::wait`], so each write is resolved at most once.
#[derive(Debug)]
pub struct PendingWrite {
    sequence: u64,
    submitted_at: Instant,
    handle: JoinHandle<Result<()>>,
}

impl PendingWrite {
    /// Wrap a spawned write task.
    pub fn from_handle(sequence: u64, handle: JoinHandle<Result<()>>) -> Self {
        Self { sequence, submitted_at: Instant::now(), handle }
    }

    /// Spawn `future` on the current runtime and track it as a write.
    pub fn spawn<F>(sequence: u64, future: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self::from_handle(sequence, tokio::spawn(future))
    }

    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    pub const fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Time since the write was submitted.
    pub fn elapsed(&self) -> Duration {
        self.submitted_at.elapsed()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the write to complete and return its outcome.
    ///
    /// A task that panicked or was aborted resolves to
    /// [`FluxlineError::Worker`].
    pub async fn wait(self) -> Result<()> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(join_error) => Err(FluxlineError::from(InfraError::from(join_error))),
        }
    }

    /// Cancel the write without waiting for it.
    pub fn abort(self) {
        self.handle.abort();
    }
}
