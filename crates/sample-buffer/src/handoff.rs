//! Buffer Handoff State Machine
//!
//! A single atomic word tracks which buffer the acquisition side is filling,
//! which one is ready, and which one the consumer is draining. Every
//! transition is one compare-and-swap loop, so the producer side can run from
//! an interrupt-style context without taking a lock.

use crate::error::HandoffError;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use tracing::{debug, warn};

const READY_A: u16 = 1 << 0;
const READY_B: u16 = 1 << 1;
const FILLING_A: u16 = 1 << 2;
const FILLING_B: u16 = 1 << 3;
const CONSUMING_A: u16 = 1 << 4;
const CONSUMING_B: u16 = 1 << 5;
const GAP_A: u16 = 1 << 6;
const GAP_B: u16 = 1 << 7;
/// A window was lost and the next fill has not been committed yet
const GAP_PENDING: u16 = 1 << 8;

/// One of the two acquisition buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferId {
    A,
    B,
}

impl BufferId {
    /// The buffer the hardware alternates to next
    pub fn other(self) -> Self {
        match self {
            BufferId::A => BufferId::B,
            BufferId::B => BufferId::A,
        }
    }

    /// Slot index (A = 0, B = 1)
    pub fn index(self) -> usize {
        match self {
            BufferId::A => 0,
            BufferId::B => 1,
        }
    }

    fn ready(self) -> u16 {
        match self {
            BufferId::A => READY_A,
            BufferId::B => READY_B,
        }
    }

    fn filling(self) -> u16 {
        match self {
            BufferId::A => FILLING_A,
            BufferId::B => FILLING_B,
        }
    }

    fn consuming(self) -> u16 {
        match self {
            BufferId::A => CONSUMING_A,
            BufferId::B => CONSUMING_B,
        }
    }

    fn gap(self) -> u16 {
        match self {
            BufferId::A => GAP_A,
            BufferId::B => GAP_B,
        }
    }
}

/// Observable handoff state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffState {
    /// Nothing ready, nothing being drained
    Idle,
    /// Buffer A filled and waiting for the consumer
    BufferAReady,
    /// Buffer B filled and waiting for the consumer
    BufferBReady,
    /// The consumer is draining a buffer
    Consuming,
}

/// Result of a completion notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Buffer marked ready
    Ready,
    /// Buffer marked ready; the other buffer was still untaken and was dropped
    Superseded(BufferId),
}

/// A buffer handed to the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyBuffer {
    /// Which buffer to drain
    pub id: BufferId,
    /// At least one window was lost between the previous drained buffer and this one
    pub follows_gap: bool,
}

/// Snapshot of handoff counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandoffStats {
    /// Buffers marked ready
    pub notified: u64,
    /// Buffers handed to the consumer
    pub taken: u64,
    /// Windows produced but never drained
    pub overruns: u64,
}

/// Lock-free handoff between one producer and one consumer
///
/// Ownership transitions are crate-private: outside this crate they happen
/// only through [`FillGuard`](crate::FillGuard) and
/// [`SampleGuard`](crate::SampleGuard), so a slot can never be read and
/// written at once. The public surface is observation only.
///
/// Overrun policy: the buffer being drained is never written. A fill aimed at
/// it is refused (the newest window is lost). A ready buffer the consumer has
/// not taken yet is dropped when a newer window supersedes it. Either way the
/// loss is counted once and the next committed window is tagged with
/// `follows_gap`.
#[derive(Debug, Default)]
pub struct Handoff {
    bits: AtomicU16,
    notified: AtomicU64,
    taken: AtomicU64,
    overruns: AtomicU64,
}

impl Handoff {
    /// Create an idle handoff
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer claims `which` before writing into it
    ///
    /// Returns `Some(which)` when `which` still held a ready window the
    /// consumer never took; that window is dropped.
    pub(crate) fn begin_fill(&self, which: BufferId) -> Result<Option<BufferId>, HandoffError> {
        let mut superseded = false;
        let result = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                superseded = false;
                if bits & which.filling() != 0 {
                    return None;
                }
                if bits & which.consuming() != 0 {
                    // Lost window: make sure the next commit reports the gap
                    return Some(bits | GAP_PENDING);
                }
                let mut next = bits | which.filling();
                if bits & which.ready() != 0 {
                    superseded = true;
                    next = (next & !which.ready() & !which.gap()) | GAP_PENDING;
                }
                Some(next)
            });

        match result {
            Err(_) => Err(HandoffError::AlreadyFilling(which)),
            Ok(bits) if bits & which.consuming() != 0 => {
                self.overruns.fetch_add(1, Ordering::Relaxed);
                warn!("Buffer {:?} still being drained, window dropped", which);
                Err(HandoffError::BufferBusy(which))
            }
            Ok(_) => {
                if superseded {
                    self.overruns.fetch_add(1, Ordering::Relaxed);
                    warn!("Buffer {:?} was never taken, overwriting it", which);
                    return Ok(Some(which));
                }
                Ok(None)
            }
        }
    }

    /// Completion signal: `which` has been filled
    ///
    /// Must be called exactly once per successful `begin_fill`.
    pub(crate) fn notify_buffer_ready(&self, which: BufferId) -> Result<Notification, HandoffError> {
        let other = which.other();
        let prev = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                if bits & which.filling() == 0 {
                    return None;
                }
                let mut next = (bits & !which.filling()) | which.ready();
                if bits & GAP_PENDING != 0 {
                    next = (next & !GAP_PENDING) | which.gap();
                }
                if bits & other.ready() != 0 {
                    next = (next & !other.ready() & !other.gap()) | which.gap();
                }
                Some(next)
            })
            .map_err(|_| HandoffError::NotFilling(which))?;

        self.notified.fetch_add(1, Ordering::Relaxed);
        if prev & other.ready() != 0 {
            self.overruns.fetch_add(1, Ordering::Relaxed);
            warn!("Buffer {:?} superseded by {:?} before it was drained", other, which);
            Ok(Notification::Superseded(other))
        } else {
            Ok(Notification::Ready)
        }
    }

    /// Producer gives up a claimed buffer without committing it
    ///
    /// The partial window is lost and counted as an overrun.
    pub(crate) fn abort_fill(&self, which: BufferId) {
        let prev = self
            .bits
            .fetch_and(!which.filling(), Ordering::AcqRel);
        if prev & which.filling() != 0 {
            self.bits.fetch_or(GAP_PENDING, Ordering::AcqRel);
            self.overruns.fetch_add(1, Ordering::Relaxed);
            warn!("Fill of buffer {:?} aborted", which);
        }
    }

    /// Consumer takes the ready buffer, if any, and starts draining it
    pub(crate) fn take_ready_buffer(&self) -> Option<ReadyBuffer> {
        let prev = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                let which = ready_in(bits)?;
                Some((bits & !which.ready() & !which.gap()) | which.consuming())
            })
            .ok()?;

        let id = ready_in(prev)?;
        self.taken.fetch_add(1, Ordering::Relaxed);
        debug!("Took buffer {:?}", id);
        Some(ReadyBuffer {
            id,
            follows_gap: prev & id.gap() != 0,
        })
    }

    /// Consumer marks `which` free for rewrite
    pub(crate) fn release(&self, which: BufferId) {
        self.bits.fetch_and(!which.consuming(), Ordering::Release);
    }

    /// Current state snapshot
    pub fn state(&self) -> HandoffState {
        let bits = self.bits.load(Ordering::Acquire);
        if bits & (CONSUMING_A | CONSUMING_B) != 0 {
            HandoffState::Consuming
        } else if bits & READY_A != 0 {
            HandoffState::BufferAReady
        } else if bits & READY_B != 0 {
            HandoffState::BufferBReady
        } else {
            HandoffState::Idle
        }
    }

    /// Whether `which` is currently marked ready
    pub fn is_ready(&self, which: BufferId) -> bool {
        self.bits.load(Ordering::Acquire) & which.ready() != 0
    }

    /// Whether the consumer is draining `which`
    pub fn is_consuming(&self, which: BufferId) -> bool {
        self.bits.load(Ordering::Acquire) & which.consuming() != 0
    }

    /// Windows produced but never drained
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Counter snapshot
    pub fn stats(&self) -> HandoffStats {
        HandoffStats {
            notified: self.notified.load(Ordering::Relaxed),
            taken: self.taken.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }
}

fn ready_in(bits: u16) -> Option<BufferId> {
    if bits & READY_A != 0 {
        Some(BufferId::A)
    } else if bits & READY_B != 0 {
        Some(BufferId::B)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn produce(handoff: &Handoff, which: BufferId) -> Result<Notification, HandoffError> {
        handoff.begin_fill(which)?;
        handoff.notify_buffer_ready(which)
    }

    #[test]
    fn test_idle_take_returns_none() {
        let handoff = Handoff::new();
        assert_eq!(handoff.state(), HandoffState::Idle);
        assert!(handoff.take_ready_buffer().is_none());
    }

    #[test]
    fn test_alternation_in_order() {
        let handoff = Handoff::new();
        let mut which = BufferId::A;

        for _ in 0..6 {
            assert_eq!(produce(&handoff, which).unwrap(), Notification::Ready);
            let ready = handoff.take_ready_buffer().unwrap();
            assert_eq!(ready.id, which);
            assert!(!ready.follows_gap);
            handoff.release(which);
            which = which.other();
        }

        assert_eq!(handoff.overruns(), 0);
        assert_eq!(handoff.stats().taken, 6);
    }

    #[test]
    fn test_fill_overlaps_consumption() {
        let handoff = Handoff::new();
        produce(&handoff, BufferId::A).unwrap();
        let a = handoff.take_ready_buffer().unwrap();

        // B fills while A is being drained: the normal double-buffer case
        assert_eq!(produce(&handoff, BufferId::B).unwrap(), Notification::Ready);
        assert_eq!(handoff.state(), HandoffState::Consuming);
        handoff.release(a.id);

        let b = handoff.take_ready_buffer().unwrap();
        assert_eq!(b.id, BufferId::B);
        assert!(!b.follows_gap);
        assert_eq!(handoff.overruns(), 0);
    }

    #[test]
    fn test_untaken_buffer_is_superseded() {
        let handoff = Handoff::new();
        produce(&handoff, BufferId::A).unwrap();
        assert_eq!(handoff.state(), HandoffState::BufferAReady);

        let note = produce(&handoff, BufferId::B).unwrap();
        assert_eq!(note, Notification::Superseded(BufferId::A));
        assert!(!handoff.is_ready(BufferId::A));
        assert_eq!(handoff.state(), HandoffState::BufferBReady);

        let b = handoff.take_ready_buffer().unwrap();
        assert_eq!(b.id, BufferId::B);
        assert!(b.follows_gap);
        handoff.release(b.id);

        // Exactly one buffer drained, never the dropped one
        assert!(handoff.take_ready_buffer().is_none());
        assert_eq!(handoff.overruns(), 1);
    }

    #[test]
    fn test_busy_buffer_refuses_fill() {
        let handoff = Handoff::new();
        produce(&handoff, BufferId::A).unwrap();
        let a = handoff.take_ready_buffer().unwrap();
        produce(&handoff, BufferId::B).unwrap();

        // Hardware wraps back to A while the consumer still holds it
        assert!(matches!(
            handoff.begin_fill(BufferId::A),
            Err(HandoffError::BufferBusy(BufferId::A))
        ));
        assert_eq!(handoff.overruns(), 1);
        handoff.release(a.id);

        // B was filled before the loss, so it is still contiguous
        let b = handoff.take_ready_buffer().unwrap();
        assert!(!b.follows_gap);
        handoff.release(b.id);

        // The next committed window follows the lost one
        produce(&handoff, BufferId::A).unwrap();
        let next = handoff.take_ready_buffer().unwrap();
        assert_eq!(next.id, BufferId::A);
        assert!(next.follows_gap);
    }

    #[test]
    fn test_refill_of_untaken_buffer_counts_once() {
        let handoff = Handoff::new();
        produce(&handoff, BufferId::A).unwrap();
        assert_eq!(handoff.begin_fill(BufferId::A).unwrap(), Some(BufferId::A));
        assert!(!handoff.is_ready(BufferId::A));
        assert_eq!(handoff.notify_buffer_ready(BufferId::A).unwrap(), Notification::Ready);
        assert_eq!(handoff.overruns(), 1);
        assert!(handoff.take_ready_buffer().unwrap().follows_gap);
    }

    #[test]
    fn test_notify_without_claim_is_rejected() {
        let handoff = Handoff::new();
        assert!(matches!(
            handoff.notify_buffer_ready(BufferId::B),
            Err(HandoffError::NotFilling(BufferId::B))
        ));
        assert_eq!(handoff.stats().notified, 0);
    }

    #[test]
    fn test_double_claim_is_rejected() {
        let handoff = Handoff::new();
        handoff.begin_fill(BufferId::A).unwrap();
        assert!(matches!(
            handoff.begin_fill(BufferId::A),
            Err(HandoffError::AlreadyFilling(BufferId::A))
        ));
    }

    proptest! {
        #[test]
        fn prop_at_most_one_ready(ops in proptest::collection::vec(0u8..3, 1..200)) {
            let handoff = Handoff::new();
            let mut next = BufferId::A;
            let mut held: Option<BufferId> = None;
            let mut produced = 0u64;
            let mut drained = 0u64;

            for op in ops {
                match op {
                    0 => {
                        // A refused fill is still a produced (and lost) window
                        let _ = produce(&handoff, next);
                        produced += 1;
                        next = next.other();
                    }
                    1 => {
                        if held.is_none() {
                            if let Some(ready) = handoff.take_ready_buffer() {
                                held = Some(ready.id);
                            }
                        }
                    }
                    _ => {
                        if let Some(id) = held.take() {
                            handoff.release(id);
                            drained += 1;
                        }
                    }
                }
                prop_assert!(!(handoff.is_ready(BufferId::A) && handoff.is_ready(BufferId::B)));
            }

            let pending = u64::from(handoff.is_ready(BufferId::A) || handoff.is_ready(BufferId::B));
            let in_flight = u64::from(held.is_some());
            prop_assert_eq!(produced, drained + in_flight + pending + handoff.overruns());
        }
    }
}
