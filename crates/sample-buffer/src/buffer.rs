//! Double Buffer Storage

use crate::error::HandoffError;
use crate::handoff::{BufferId, Handoff, Notification, ReadyBuffer};
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};

/// Default buffer capacity (samples per window)
pub const DEFAULT_CAPACITY: usize = 256;

/// Two fixed-capacity sample buffers guarded by a [`Handoff`]
///
/// Storage is allocated once; access goes through [`FillGuard`] on the
/// acquisition side and [`SampleGuard`] on the consumer side, and each guard
/// can only exist while the handoff grants its side ownership of the slot.
pub struct DoubleBuffer {
    /// Pre-allocated storage for buffers A and B
    slots: [UnsafeCell<Box<[u16]>>; 2],
    /// Samples per buffer
    capacity: usize,
    /// Ownership state
    handoff: Handoff,
}

impl DoubleBuffer {
    /// Create a double buffer with `capacity` samples per buffer
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Buffer capacity must be > 0");
        Self {
            slots: [
                UnsafeCell::new(vec![0u16; capacity].into_boxed_slice()),
                UnsafeCell::new(vec![0u16; capacity].into_boxed_slice()),
            ],
            capacity,
            handoff: Handoff::new(),
        }
    }

    /// Create a double buffer with the default capacity (256 samples)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Samples per buffer
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ownership state shared by both sides
    ///
    /// Read-only from outside the crate; ownership moves only through the
    /// guards.
    ///
    /// ```compile_fail
    /// use sample_buffer::{BufferId, DoubleBuffer};
    ///
    /// let buffers = DoubleBuffer::new(4);
    /// buffers.handoff().release(BufferId::A);
    /// ```
    pub fn handoff(&self) -> &Handoff {
        &self.handoff
    }

    /// Claim `which` for writing (acquisition side)
    pub fn fill(&self, which: BufferId) -> Result<FillGuard<'_>, HandoffError> {
        let superseded = self.handoff.begin_fill(which)?;
        Ok(FillGuard {
            buffers: self,
            id: which,
            superseded,
            committed: false,
        })
    }

    /// Take the ready buffer for reading (consumer side)
    pub fn take_ready(&self) -> Option<SampleGuard<'_>> {
        let ready = self.handoff.take_ready_buffer()?;
        Some(SampleGuard {
            buffers: self,
            ready,
        })
    }
}

// SAFETY: slot contents are only reachable through FillGuard / SampleGuard,
// the handoff transitions that create and retire them are crate-private, and
// the handoff never lets a slot be filling and consuming at the same time.
unsafe impl Send for DoubleBuffer {}
unsafe impl Sync for DoubleBuffer {}

/// Exclusive write access to a buffer being filled
pub struct FillGuard<'a> {
    buffers: &'a DoubleBuffer,
    id: BufferId,
    /// Untaken window dropped by this claim
    superseded: Option<BufferId>,
    committed: bool,
}

impl FillGuard<'_> {
    /// Buffer being filled
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Buffer whose untaken window was dropped to make room for this fill
    pub fn superseded(&self) -> Option<BufferId> {
        self.superseded
    }

    /// Copy `samples` into the front of the buffer
    pub fn copy_from(&mut self, samples: &[u16]) -> Result<(), HandoffError> {
        let capacity = self.buffers.capacity;
        if samples.len() > capacity {
            return Err(HandoffError::CapacityExceeded {
                len: samples.len(),
                capacity,
            });
        }
        self[..samples.len()].copy_from_slice(samples);
        Ok(())
    }

    /// Finish the fill and raise the completion signal
    pub fn commit(mut self) -> Result<Notification, HandoffError> {
        self.committed = true;
        self.buffers.handoff.notify_buffer_ready(self.id)
    }
}

impl Deref for FillGuard<'_> {
    type Target = [u16];

    fn deref(&self) -> &[u16] {
        // SAFETY: the handoff granted this guard exclusive ownership of the slot
        unsafe { &*self.buffers.slots[self.id.index()].get() }
    }
}

impl DerefMut for FillGuard<'_> {
    fn deref_mut(&mut self) -> &mut [u16] {
        // SAFETY: as above; the consumer cannot take a slot that is filling
        unsafe { &mut *self.buffers.slots[self.id.index()].get() }
    }
}

impl Drop for FillGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.buffers.handoff.abort_fill(self.id);
        }
    }
}

/// Read access to a buffer being drained; releases it on drop
pub struct SampleGuard<'a> {
    buffers: &'a DoubleBuffer,
    ready: ReadyBuffer,
}

impl SampleGuard<'_> {
    /// Buffer being drained
    pub fn id(&self) -> BufferId {
        self.ready.id
    }

    /// Whether a window was lost right before this one
    pub fn follows_gap(&self) -> bool {
        self.ready.follows_gap
    }
}

impl Deref for SampleGuard<'_> {
    type Target = [u16];

    fn deref(&self) -> &[u16] {
        // SAFETY: the producer cannot claim a slot while it is consuming
        unsafe { &*self.buffers.slots[self.ready.id.index()].get() }
    }
}

impl Drop for SampleGuard<'_> {
    fn drop(&mut self) {
        self.buffers.handoff.release(self.ready.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::HandoffState;

    #[test]
    fn test_fill_and_take() {
        let buffers = DoubleBuffer::new(4);
        let mut fill = buffers.fill(BufferId::A).unwrap();
        fill.copy_from(&[1, 2, 3, 4]).unwrap();
        fill.commit().unwrap();

        let samples = buffers.take_ready().unwrap();
        assert_eq!(samples.id(), BufferId::A);
        assert_eq!(&samples[..], &[1, 2, 3, 4]);
        assert_eq!(buffers.handoff().state(), HandoffState::Consuming);

        drop(samples);
        assert_eq!(buffers.handoff().state(), HandoffState::Idle);
    }

    #[test]
    fn test_consumed_buffer_cannot_be_refilled() {
        let buffers = DoubleBuffer::new(2);
        buffers.fill(BufferId::A).unwrap().commit().unwrap();
        let held = buffers.take_ready().unwrap();

        assert!(buffers.fill(BufferId::A).is_err());
        drop(held);
        assert!(buffers.fill(BufferId::A).is_ok());
    }

    #[test]
    fn test_dropped_fill_is_aborted() {
        let buffers = DoubleBuffer::new(2);
        {
            let mut fill = buffers.fill(BufferId::B).unwrap();
            fill[0] = 7;
        }
        assert!(buffers.take_ready().is_none());
        assert_eq!(buffers.handoff().overruns(), 1);

        // The slot can be claimed again
        buffers.fill(BufferId::B).unwrap().commit().unwrap();
        assert!(buffers.take_ready().unwrap().follows_gap());
    }

    #[test]
    fn test_copy_beyond_capacity() {
        let buffers = DoubleBuffer::new(2);
        let mut fill = buffers.fill(BufferId::A).unwrap();
        assert!(matches!(
            fill.copy_from(&[1, 2, 3]),
            Err(HandoffError::CapacityExceeded { len: 3, capacity: 2 })
        ));
    }

    #[test]
    fn test_held_samples_survive_producer_wraparound() {
        let buffers = DoubleBuffer::new(2);
        let mut fill = buffers.fill(BufferId::A).unwrap();
        fill.copy_from(&[1, 2]).unwrap();
        fill.commit().unwrap();
        let held = buffers.take_ready().unwrap();

        // The producer cannot reach A again until the guard is gone
        assert!(matches!(
            buffers.fill(BufferId::A),
            Err(HandoffError::BufferBusy(BufferId::A))
        ));
        assert_eq!(&held[..], &[1, 2]);
        drop(held);

        let mut fill = buffers.fill(BufferId::A).unwrap();
        fill.copy_from(&[9, 9]).unwrap();
        fill.commit().unwrap();
        assert_eq!(&buffers.take_ready().unwrap()[..], &[9, 9]);
    }

    #[test]
    fn test_open_fill_is_invisible_to_consumer() {
        let buffers = DoubleBuffer::new(2);
        let mut fill = buffers.fill(BufferId::B).unwrap();
        fill.copy_from(&[3, 4]).unwrap();
        assert!(buffers.take_ready().is_none());
        assert!(!buffers.handoff().is_ready(BufferId::B));

        fill.commit().unwrap();
        assert_eq!(&buffers.take_ready().unwrap()[..], &[3, 4]);
    }

    #[test]
    fn test_refill_reports_superseded_window() {
        let buffers = DoubleBuffer::new(2);
        let first = buffers.fill(BufferId::A).unwrap();
        assert_eq!(first.superseded(), None);
        first.commit().unwrap();

        let again = buffers.fill(BufferId::A).unwrap();
        assert_eq!(again.superseded(), Some(BufferId::A));
        again.commit().unwrap();
        assert_eq!(buffers.handoff().overruns(), 1);
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(DoubleBuffer::with_default_capacity().capacity(), 256);
    }
}
