//! Single-slot frame handoff between a producer thread and a consumer thread.
//!
//! The slot holds at most one pending frame. Publishing overwrites whatever is
//! pending, consuming takes it and leaves the slot empty. Only the freshest
//! frame is ever handed to the consumer; stale frames are counted and dropped.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Last-writer-wins handoff slot.
///
/// Both `publish` and `consume` hold the lock only for a single
/// `Option::replace` / `Option::take`, so the frame payload is never copied
/// under the lock and neither side can observe a partially written frame.
pub struct FrameSlot<T> {
    pending: Mutex<Option<T>>,
    /// Monotonic count of publishes.
    sequence: AtomicU64,
    /// Frames overwritten before the consumer took them.
    dropped: AtomicU64,
}

impl<T> FrameSlot<T> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
            sequence: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Replace the pending frame unconditionally.
    ///
    /// A frame that was still pending is dropped. The displaced value is
    /// released after the lock is gone so its destructor never runs inside the
    /// critical section.
    pub fn publish(&self, frame: T) {
        let displaced = self.pending.lock().replace(frame);
        self.sequence.fetch_add(1, Ordering::Relaxed);
        if displaced.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        drop(displaced);
    }

    /// Take the pending frame, leaving the slot empty. Never blocks beyond
    /// the bounded critical section.
    pub fn consume(&self) -> Option<T> {
        self.pending.lock().take()
    }

    /// Whether a frame is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Number of publishes since creation.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Number of frames overwritten before they were consumed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Discard any pending frame, e.g. when the consuming surface goes away.
    pub fn clear(&self) {
        let discarded = self.pending.lock().take();
        drop(discarded);
    }
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
