//! Background reconciler for asynchronous writes.
//!
//! Writes sent with `send_async` are started immediately and their handles
//! queued. The reconciler wakes every poll interval, pops handles in
//! submission order, waits for each one, and routes failures to a
//! [`WriteErrorHandler`]. Callers never see the outcome.
//!
//! Lifecycle is `Idle → Running → Stopping → Stopped`. Shutdown closes the
//! queue and cancels the poll loop, then runs one last drain pass so that
//! every write accepted before shutdown is awaited. A stopped reconciler
//! cannot be restarted.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fluxline_infra::observability::metrics::WriteMetrics;
//! use fluxline_infra::{AsyncWriteReconciler, LoggingErrorHandler, ReconcilerConfig, WriteQueue};
//!
//! # async fn example() -> fluxline_domain::Result<()> {
//! let queue = Arc::new(WriteQueue::unbounded());
//! let reconciler = AsyncWriteReconciler::new(
//!     Arc::clone(&queue),
//!     Arc::new(LoggingErrorHandler),
//!     ReconcilerConfig::default(),
//!     Arc::new(WriteMetrics::new()),
//! );
//!
//! reconciler.start()?;
//! // ... enqueue pending writes ...
//! reconciler.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use fluxline_core::{WriteErrorHandler, WriteFailure};
use fluxline_domain::constants::{DEFAULT_JOIN_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_MS};
use fluxline_domain::{FluxlineError, Result};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::observability::metrics::WriteMetrics;
use crate::observability::log_metric;
use crate::writer::WriteQueue;

/// Configuration for the write reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Sleep between drain passes
    pub poll_interval: Duration,
    /// Join timeout when shutting down
    pub join_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            join_timeout: Duration::from_secs(DEFAULT_JOIN_TIMEOUT_SECS),
        }
    }
}

/// Lifecycle state of an [`AsyncWriteReconciler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    /// Constructed, no task spawned.
    Idle,
    /// Poll loop active.
    Running,
    /// Shutdown requested; final drain in progress.
    Stopping,
    /// Task joined. Terminal.
    Stopped,
}

/// Outcome counts of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Writes the server accepted.
    pub succeeded: usize,
    /// Writes handed to the error handler.
    pub failed: usize,
}

impl DrainSummary {
    /// Writes awaited in the pass, whatever their outcome.
    pub const fn resolved(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Single background worker that resolves queued writes in FIFO order.
pub struct AsyncWriteReconciler {
    queue: Arc<WriteQueue>,
    handler: Arc<dyn WriteErrorHandler>,
    config: ReconcilerConfig,
    cancellation: CancellationToken,
    state: Mutex<ReconcilerState>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
    shutdown_lock: tokio::sync::Mutex<()>,
    metrics: Arc<WriteMetrics>,
}

impl AsyncWriteReconciler {
    /// Build an idle reconciler over `queue`. Nothing runs until
    /// [`start`](Self::start).
    pub fn new(
        queue: Arc<WriteQueue>,
        handler: Arc<dyn WriteErrorHandler>,
        config: ReconcilerConfig,
        metrics: Arc<WriteMetrics>,
    ) -> Self {
        Self {
            queue,
            handler,
            config,
            cancellation: CancellationToken::new(),
            state: Mutex::new(ReconcilerState::Idle),
            task_handle: Mutex::new(None),
            shutdown_lock: tokio::sync::Mutex::new(()),
            metrics,
        }
    }

    /// Spawn the background task on the current tokio runtime.
    pub fn start(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|err| {
            FluxlineError::Internal(format!("no tokio runtime for write reconciler: {err}"))
        })?;
        self.start_on(&runtime)
    }

    /// Spawn the background task on `runtime`.
    #[instrument(skip(self, runtime))]
    pub fn start_on(&self, runtime: &Handle) -> Result<()> {
        let mut state = self.state.lock();
        match *state {
            ReconcilerState::Idle => {}
            ReconcilerState::Running => {
                return Err(FluxlineError::Worker("reconciler already running".into()));
            }
            ReconcilerState::Stopping | ReconcilerState::Stopped => {
                return Err(FluxlineError::Worker(
                    "reconciler cannot be restarted after shutdown".into(),
                ));
            }
        }

        info!(poll_interval_ms = self.config.poll_interval.as_millis() as u64, "Starting write reconciler");

        let queue = Arc::clone(&self.queue);
        let handler = Arc::clone(&self.handler);
        let metrics = Arc::clone(&self.metrics);
        let poll_interval = self.config.poll_interval;
        let cancel = self.cancellation.clone();

        let handle = runtime.spawn(async move {
            Self::process_loop(queue, handler, poll_interval, cancel, metrics).await;
        });

        *self.task_handle.lock() = Some(handle);
        *state = ReconcilerState::Running;
        Ok(())
    }

    /// Close the queue, stop the poll loop, and wait for the final drain.
    ///
    /// Every caller waits until the reconciler is `Stopped`; once it is,
    /// later calls return `Ok(())` at once. If the join times out the task
    /// keeps draining and the state stays `Stopping`, so calling again
    /// resumes the wait.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        let _shutdown = self.shutdown_lock.lock().await;

        let previous = {
            let mut state = self.state.lock();
            let previous = *state;
            if matches!(previous, ReconcilerState::Idle | ReconcilerState::Running) {
                *state = ReconcilerState::Stopping;
            }
            previous
        };
        self.queue.close();

        match previous {
            ReconcilerState::Stopped => return Ok(()),
            ReconcilerState::Idle => {
                // No task to join; writes queued without a worker are still awaited.
                let summary =
                    Self::drain_pass(&self.queue, self.handler.as_ref(), &self.metrics).await;
                debug!(resolved = summary.resolved(), "Drained idle write queue");
                *self.state.lock() = ReconcilerState::Stopped;
                return Ok(());
            }
            ReconcilerState::Running => {
                info!(pending = self.queue.len(), "Stopping write reconciler");
                self.cancellation.cancel();
            }
            ReconcilerState::Stopping => {
                debug!(pending = self.queue.len(), "Resuming wait for write reconciler");
            }
        }

        let handle = self.task_handle.lock().take();
        let Some(mut handle) = handle else {
            *self.state.lock() = ReconcilerState::Stopped;
            return Ok(());
        };

        let joined = tokio::time::timeout(self.config.join_timeout, &mut handle).await;
        let result = match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("Reconciler task panicked: {}", e);
                // Whatever the task left behind is resolved here instead.
                let summary =
                    Self::drain_pass(&self.queue, self.handler.as_ref(), &self.metrics).await;
                debug!(resolved = summary.resolved(), "Drained write queue after panic");
                Err(FluxlineError::Worker("reconciler task panicked".into()))
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.config.join_timeout.as_secs(),
                    pending = self.queue.len(),
                    "Reconciler task did not complete within timeout"
                );
                *self.task_handle.lock() = Some(handle);
                return Err(FluxlineError::Worker("reconciler shutdown timed out".into()));
            }
        };

        *self.state.lock() = ReconcilerState::Stopped;
        info!("Write reconciler stopped");
        result
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ReconcilerState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ReconcilerState::Running
    }

    /// Poll interval and join timeout this reconciler was built with.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    async fn process_loop(
        queue: Arc<WriteQueue>,
        handler: Arc<dyn WriteErrorHandler>,
        poll_interval: Duration,
        cancel: CancellationToken,
        metrics: Arc<WriteMetrics>,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Write reconciler loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(poll_interval) => {
                    let summary = Self::drain_pass(&queue, handler.as_ref(), &metrics).await;
                    if summary.resolved() > 0 {
                        debug!(succeeded = summary.succeeded, failed = summary.failed, "Drain pass completed");
                    }
                }
            }
        }

        queue.close();
        let summary = Self::drain_pass(&queue, handler.as_ref(), &metrics).await;
        debug!(succeeded = summary.succeeded, failed = summary.failed, "Final drain pass completed");
    }

    /// Resolve queued writes until the queue is empty.
    ///
    /// The queue lock is released before each wait, so producers keep
    /// enqueueing while an older write resolves.
    pub(crate) async fn drain_pass(
        queue: &WriteQueue,
        handler: &dyn WriteErrorHandler,
        metrics: &WriteMetrics,
    ) -> DrainSummary {
        let mut summary = DrainSummary::default();

        while let Some(pending) = queue.drain_one() {
            let sequence = pending.sequence();
            let submitted_at = pending.submitted_at();
            let outcome = pending.wait().await;
            let elapsed = submitted_at.elapsed();
            log_metric(metrics.record_wait_time(elapsed), "writer.wait_time");

            match outcome {
                Ok(()) => {
                    trace!(sequence, "Asynchronous write succeeded");
                    log_metric(metrics.record_success(), "writer.succeeded");
                    summary.succeeded += 1;
                }
                Err(error) => {
                    log_metric(metrics.record_failure(), "writer.failed");
                    handler.on_write_failure(WriteFailure { sequence, elapsed, error });
                    summary.failed += 1;
                }
            }
        }

        log_metric(metrics.record_drain_pass(), "writer.drain_pass");
        summary
    }
}

impl Drop for AsyncWriteReconciler {
    fn drop(&mut self) {
        if matches!(*self.state.get_mut(), ReconcilerState::Running | ReconcilerState::Stopping) {
            warn!("AsyncWriteReconciler dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::writer::PendingWrite;

    use super::*;

    type Seen = Arc<Mutex<Vec<u64>>>;

    fn recording_handler() -> (Arc<dyn WriteErrorHandler>, Seen) {
        let seen: Seen = Arc::default();
        let sink = Arc::clone(&seen);
        let handler: Arc<dyn WriteErrorHandler> =
            Arc::new(move |failure: WriteFailure| sink.lock().push(failure.sequence));
        (handler, seen)
    }

    fn reconciler(
        queue: &Arc<WriteQueue>,
        handler: Arc<dyn WriteErrorHandler>,
        poll_interval: Duration,
    ) -> (AsyncWriteReconciler, Arc<WriteMetrics>) {
        let metrics = Arc::new(WriteMetrics::new());
        let reconciler = AsyncWriteReconciler::new(
            Arc::clone(queue),
            handler,
            ReconcilerConfig { poll_interval, join_timeout: Duration::from_secs(5) },
            Arc::clone(&metrics),
        );
        (reconciler, metrics)
    }

    fn failing_after(sequence: u64, delay: Duration) -> PendingWrite {
        PendingWrite::spawn(sequence, async move {
            tokio::time::sleep(delay).await;
            Err(FluxlineError::Status { status: 500, reason: "Internal Server Error".into() })
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failures_are_reported_in_submission_order() {
        let queue = Arc::new(WriteQueue::unbounded());
        let (handler, seen) = recording_handler();
        let (reconciler, metrics) = reconciler(&queue, handler, Duration::from_millis(10));

        // Later writes finish first.
        for sequence in 1..=5u64 {
            let delay = Duration::from_millis((6 - sequence) * 20);
            queue.enqueue(failing_after(sequence, delay)).unwrap();
        }

        reconciler.start().unwrap();
        reconciler.shutdown().await.unwrap();

        assert_eq!(*seen.lock(), vec![1, 2, 3, 4, 5]);
        assert_eq!(metrics.snapshot().failed, 5);
        assert!(queue.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn successes_are_not_reported() {
        let queue = Arc::new(WriteQueue::unbounded());
        let (handler, seen) = recording_handler();
        let (reconciler, metrics) = reconciler(&queue, handler, Duration::from_millis(10));
        reconciler.start().unwrap();

        queue.enqueue(PendingWrite::spawn(1, async { Ok(()) })).unwrap();
        queue.enqueue(failing_after(2, Duration::ZERO)).unwrap();
        queue.enqueue(PendingWrite::spawn(3, async { Ok(()) })).unwrap();

        reconciler.shutdown().await.unwrap();

        assert_eq!(*seen.lock(), vec![2]);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.succeeded, 2);
        assert_eq!(snapshot.failed, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_drains_writes_queued_before_it() {
        let queue = Arc::new(WriteQueue::unbounded());
        let (handler, _) = recording_handler();
        // Poll interval long enough that only the final pass runs.
        let (reconciler, metrics) = reconciler(&queue, handler, Duration::from_secs(60));
        reconciler.start().unwrap();

        let awaited = Arc::new(AtomicUsize::new(0));
        for sequence in 1..=8 {
            let awaited = Arc::clone(&awaited);
            queue
                .enqueue(PendingWrite::spawn(sequence, async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    awaited.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
                .unwrap();
        }

        reconciler.shutdown().await.unwrap();

        assert!(queue.is_empty());
        assert_eq!(awaited.load(Ordering::SeqCst), 8);
        assert_eq!(metrics.snapshot().succeeded, 8);
        assert_eq!(reconciler.state(), ReconcilerState::Stopped);
    }

    #[tokio::test]
    async fn shutdown_twice_is_ok() {
        let queue = Arc::new(WriteQueue::unbounded());
        let (handler, _) = recording_handler();
        let (reconciler, _) = reconciler(&queue, handler, Duration::from_millis(10));
        reconciler.start().unwrap();

        reconciler.shutdown().await.unwrap();
        reconciler.shutdown().await.unwrap();
        assert_eq!(reconciler.state(), ReconcilerState::Stopped);
    }

    #[tokio::test]
    async fn lifecycle_rejects_double_start_and_restart() {
        let queue = Arc::new(WriteQueue::unbounded());
        let (handler, _) = recording_handler();
        let (reconciler, _) = reconciler(&queue, handler, Duration::from_millis(10));

        assert_eq!(reconciler.state(), ReconcilerState::Idle);
        reconciler.start().unwrap();
        assert!(reconciler.is_running());
        assert!(matches!(reconciler.start(), Err(FluxlineError::Worker(_))));

        reconciler.shutdown().await.unwrap();
        assert!(matches!(reconciler.start(), Err(FluxlineError::Worker(_))));
    }

    #[tokio::test]
    async fn idle_shutdown_still_drains() {
        let queue = Arc::new(WriteQueue::unbounded());
        let (handler, seen) = recording_handler();
        let (reconciler, _) = reconciler(&queue, handler, Duration::from_millis(10));

        queue.enqueue(failing_after(1, Duration::ZERO)).unwrap();
        reconciler.shutdown().await.unwrap();

        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(reconciler.state(), ReconcilerState::Stopped);
    }

    fn slow_success(sequence: u64, delay: Duration) -> PendingWrite {
        PendingWrite::spawn(sequence, async move {
            tokio::time::sleep(delay).await;
            Ok(())
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_after_join_timeout_can_be_retried() {
        let queue = Arc::new(WriteQueue::unbounded());
        let (handler, _) = recording_handler();
        let metrics = Arc::new(WriteMetrics::new());
        let reconciler = AsyncWriteReconciler::new(
            Arc::clone(&queue),
            handler,
            ReconcilerConfig {
                poll_interval: Duration::from_secs(60),
                join_timeout: Duration::from_millis(50),
            },
            Arc::clone(&metrics),
        );
        reconciler.start().unwrap();
        for sequence in 1..=3 {
            queue.enqueue(slow_success(sequence, Duration::from_millis(200))).unwrap();
        }

        let first = reconciler.shutdown().await;
        assert!(matches!(first, Err(FluxlineError::Worker(ref msg)) if msg.contains("timed out")));
        assert_eq!(reconciler.state(), ReconcilerState::Stopping);

        let mut attempts = 1;
        while reconciler.shutdown().await.is_err() {
            attempts += 1;
            assert!(attempts < 100, "reconciler never finished draining");
        }

        assert_eq!(reconciler.state(), ReconcilerState::Stopped);
        assert!(queue.is_empty());
        assert_eq!(metrics.snapshot().succeeded, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_shutdown_waits_for_final_drain() {
        let queue = Arc::new(WriteQueue::unbounded());
        let (handler, _) = recording_handler();
        let (reconciler, metrics) = reconciler(&queue, handler, Duration::from_secs(60));
        let reconciler = Arc::new(reconciler);
        reconciler.start().unwrap();
        for sequence in 1..=3 {
            queue.enqueue(slow_success(sequence, Duration::from_millis(100))).unwrap();
        }

        let first = {
            let reconciler = Arc::clone(&reconciler);
            tokio::spawn(async move { reconciler.shutdown().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        reconciler.shutdown().await.unwrap();

        assert_eq!(reconciler.state(), ReconcilerState::Stopped);
        assert!(queue.is_empty());
        assert_eq!(metrics.snapshot().succeeded, 3);
        first.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn queue_is_closed_once_shutdown_starts() {
        let queue = Arc::new(WriteQueue::unbounded());
        let (handler, _) = recording_handler();
        let (reconciler, _) = reconciler(&queue, handler, Duration::from_millis(10));
        reconciler.start().unwrap();

        reconciler.shutdown().await.unwrap();

        assert!(queue.is_closed());
        let rejected = queue.enqueue(slow_success(1, Duration::ZERO)).unwrap_err();
        assert!(matches!(rejected, crate::writer::EnqueueError::Closed { .. }));
    }

    #[tokio::test]
    async fn drain_pass_on_empty_queue_counts_pass() {
        let queue = WriteQueue::unbounded();
        let (handler, _) = recording_handler();
        let metrics = WriteMetrics::new();

        let summary = AsyncWriteReconciler::drain_pass(&queue, handler.as_ref(), &metrics).await;

        assert_eq!(summary, DrainSummary::default());
        assert_eq!(metrics.snapshot().drain_passes, 1);
    }
}
