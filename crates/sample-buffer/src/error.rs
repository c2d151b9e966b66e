//! Handoff Error Types

use crate::handoff::BufferId;
use thiserror::Error;

/// Errors raised by the buffer handoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandoffError {
    /// The consumer is still draining the buffer the producer wants to fill
    #[error("Buffer {0:?} is still being drained, window dropped")]
    BufferBusy(BufferId),

    /// The producer claimed a buffer it is already filling
    #[error("Buffer {0:?} is already being filled")]
    AlreadyFilling(BufferId),

    /// Completion signalled for a buffer that was never claimed
    #[error("Completion signalled for buffer {0:?} without a fill in progress")]
    NotFilling(BufferId),

    /// Samples written past the buffer capacity
    #[error("Fill of {len} samples exceeds buffer capacity {capacity}")]
    CapacityExceeded { len: usize, capacity: usize },
}
