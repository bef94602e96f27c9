//! Built-in handlers for failed asynchronous writes.

use fluxline_core::{WriteErrorHandler, WriteFailure};
use fluxline_domain::error_label;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

/// Logs each failure at `warn` level and drops it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingErrorHandler;

impl WriteErrorHandler for LoggingErrorHandler {
    fn on_write_failure(&self, failure: WriteFailure) {
        warn!(
            sequence = failure.sequence,
            elapsed_ms = failure.elapsed.as_millis() as u64,
            label = error_label(&failure.error),
            error = %failure.error,
            "asynchronous write failed"
        );
    }
}

/// Forwards failures into a bounded channel.
///
/// Never blocks the reconciler: when the channel is full or closed the
/// failure is logged and dropped.
#[derive(Debug, Clone)]
pub struct ChannelErrorHandler {
    sender: mpsc::Sender<WriteFailure>,
}

impl ChannelErrorHandler {
    /// Create a handler together with the receiving end of its channel.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<WriteFailure>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }
}

impl WriteErrorHandler for ChannelErrorHandler {
    fn on_write_failure(&self, failure: WriteFailure) {
        match self.sender.try_send(failure) {
            Ok(()) => {}
            Err(TrySendError::Full(failure)) => {
                warn!(sequence = failure.sequence, error = %failure.error, "failure channel full; dropping write failure");
            }
            Err(TrySendError::Closed(failure)) => {
                warn!(sequence = failure.sequence, error = %failure.error, "failure channel closed; dropping write failure");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fluxline_domain::FluxlineError;

    use super::*;

    fn failure(sequence: u64) -> WriteFailure {
        WriteFailure {
            sequence,
            elapsed: Duration::from_millis(12),
            error: FluxlineError::Status { status: 503, reason: "Service Unavailable".into() },
        }
    }

    #[test]
    fn logging_handler_accepts_failures() {
        LoggingErrorHandler.on_write_failure(failure(1));
    }

    #[tokio::test]
    async fn channel_handler_forwards_in_order() {
        let (handler, mut receiver) = ChannelErrorHandler::new(4);
        handler.on_write_failure(failure(1));
        handler.on_write_failure(failure(2));

        assert_eq!(receiver.recv().await.unwrap().sequence, 1);
        assert_eq!(receiver.recv().await.unwrap().sequence, 2);
    }

    #[tokio::test]
    async fn channel_handler_drops_when_full() {
        let (handler, mut receiver) = ChannelErrorHandler::new(1);
        handler.on_write_failure(failure(1));
        handler.on_write_failure(failure(2));

        assert_eq!(receiver.recv().await.unwrap().sequence, 1);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn channel_handler_survives_closed_receiver() {
        let (handler, receiver) = ChannelErrorHandler::new(1);
        drop(receiver);
        handler.on_write_failure(failure(1));
    }
}
