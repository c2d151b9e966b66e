//! Double-Buffered Sample Storage
//!
//! Provides the two acquisition buffers and the lock-free handoff that moves
//! each filled buffer from the acquisition side to the consumer and back.

mod buffer;
mod error;
mod handoff;

pub use buffer::{DoubleBuffer, FillGuard, SampleGuard, DEFAULT_CAPACITY};
pub use error::HandoffError;
pub use handoff::{BufferId, Handoff, HandoffState, HandoffStats, Notification, ReadyBuffer};
