//! Asynchronous write path: pending handles, their queue, and the reconciler
//! that resolves them.

mod handlers;
mod pending;
mod queue;
mod reconciler;

pub use handlers::{ChannelErrorHandler, LoggingErrorHandler};
pub use pending::PendingWrite;
pub use queue::{EnqueueError, WriteQueue};
pub use reconciler::{AsyncWriteReconciler, DrainSummary, ReconcilerConfig, ReconcilerState};
