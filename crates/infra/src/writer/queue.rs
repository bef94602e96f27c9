//! FIFO queue of pending asynchronous writes.

use std::collections::VecDeque;

use fluxline_domain::FluxlineError;
use parking_lot::Mutex;

use crate::writer::PendingWrite;

/// Returned by [`WriteQueue::enqueue`] when a write is not accepted.
///
/// Hands the rejected write back so the caller decides its fate.
#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    /// Bounded queue at capacity.
    #[error("write queue full (capacity {capacity})")]
    Full { pending: PendingWrite, capacity: usize },
    /// Queue closed by shutdown.
    #[error("write queue closed")]
    Closed { pending: PendingWrite },
}

impl EnqueueError {
    /// The write that was turned away.
    pub fn into_pending(self) -> PendingWrite {
        match self {
            Self::Full { pending, .. } | Self::Closed { pending } => pending,
        }
    }
}

impl From<EnqueueError> for FluxlineError {
    fn from(value: EnqueueError) -> Self {
        match value {
            EnqueueError::Full { capacity, .. } => FluxlineError::QueueFull { capacity },
            EnqueueError::Closed { .. } => FluxlineError::Worker("transport is shut down".into()),
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    writes: VecDeque<PendingWrite>,
    closed: bool,
}

/// Ordered pending writes, fed by callers and drained by one reconciler.
///
/// The lock is held only to push or pop; never across an await. Once
/// [`close`](Self::close)d the queue still drains but accepts nothing new.
#[derive(Debug)]
pub struct WriteQueue {
    inner: Mutex<QueueState>,
    capacity: Option<usize>,
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl WriteQueue {
    /// Queue without a size limit. Callers are responsible for not
    /// submitting faster than the server absorbs.
    pub fn unbounded() -> Self {
        Self { inner: Mutex::new(QueueState::default()), capacity: None }
    }

    pub fn bounded(capacity: usize) -> Self {
        let state = QueueState { writes: VecDeque::with_capacity(capacity), closed: false };
        Self { inner: Mutex::new(state), capacity: Some(capacity) }
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        capacity.map_or_else(Self::unbounded, Self::bounded)
    }

    /// Append `pending` at the back.
    pub fn enqueue(&self, pending: PendingWrite) -> Result<(), EnqueueError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(EnqueueError::Closed { pending });
        }
        if let Some(capacity) = self.capacity {
            if inner.writes.len() >= capacity {
                return Err(EnqueueError::Full { pending, capacity });
            }
        }
        inner.writes.push_back(pending);
        Ok(())
    }

    /// Remove the oldest pending write.
    pub fn drain_one(&self) -> Option<PendingWrite> {
        self.inner.lock().writes.pop_front()
    }

    /// Reject every later `enqueue`. Writes already queued stay drainable.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().writes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|capacity| self.len() >= capacity)
    }

    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
