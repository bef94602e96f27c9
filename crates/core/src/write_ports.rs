//! Port interface for asynchronous write failures

use std::time::Duration;

use fluxline_domain::FluxlineError;

/// An asynchronous write that the reconciler resolved as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    /// Submission order of the write, starting at 1 per transport.
    pub sequence: u64,
    /// Time between submission and resolution.
    pub elapsed: Duration,
    pub error: FluxlineError,
}

/// Receives failed asynchronous writes.
///
/// Called from the reconciler task, once per failed write, in submission
/// order. Implementations must not block: the next write is not resolved
/// until this returns.
pub trait WriteErrorHandler: Send + Sync {
    fn on_write_failure(&self, failure: WriteFailure);
}

impl<F> WriteErrorHandler for F
where
    F: Fn(WriteFailure) + Send + Sync,
{
    fn on_write_failure(&self, failure: WriteFailure) {
        self(failure);
    }
}
