//! Bounded pool of per-frame working buffers.
//!
//! Each in-flight frame owns one preprocessing buffer for the whole of its
//! processing, so concurrent frames never share scratch memory. Slots are
//! handed out round-robin; a [`FrameSlot`] returns its buffer to the pool
//! when dropped. Every acquisition also draws a monotonically increasing
//! frame sequence number that callers can use to detect out-of-order results.

use crate::util::{ArLabelError, ArLabelResult};
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Number of frames processed concurrently by default.
pub const MAX_INFLIGHT_BUFFERS: usize = 3;

struct PoolInner<T> {
    free: Mutex<VecDeque<(usize, T)>>,
    returned: Condvar,
    next_sequence: AtomicU64,
    capacity: usize,
}

impl<T> PoolInner<T> {
    fn lock(&self) -> MutexGuard<'_, VecDeque<(usize, T)>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed set of reusable buffers, one per in-flight frame.
pub struct FramePool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> Clone for FramePool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> FramePool<T> {
    /// Builds `slots` buffers with `make(slot_index)`.
    pub fn new(slots: usize, mut make: impl FnMut(usize) -> T) -> ArLabelResult<Self> {
        if slots == 0 {
            return Err(ArLabelError::InvalidParameter(
                "frame pool needs at least one slot",
            ));
        }
        let free = (0..slots).map(|idx| (idx, make(idx))).collect();
        Ok(Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(free),
                returned: Condvar::new(),
                next_sequence: AtomicU64::new(0),
                capacity: slots,
            }),
        })
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Slots currently owned by in-flight frames.
    pub fn in_flight(&self) -> usize {
        self.inner.capacity - self.inner.lock().len()
    }

    /// Takes the next free slot, or `None` if every slot is in flight.
    ///
    /// Callers that must not block (a capture callback) drop the frame.
    pub fn try_acquire(&self) -> Option<FrameSlot<T>> {
        let mut free = self.inner.lock();
        let (index, buffer) = free.pop_front()?;
        Some(self.slot(index, buffer))
    }

    /// Takes the next free slot, waiting for one to be returned.
    pub fn acquire(&self) -> FrameSlot<T> {
        let mut free = self.inner.lock();
        loop {
            if let Some((index, buffer)) = free.pop_front() {
                return self.slot(index, buffer);
            }
            free = self
                .inner
                .returned
                .wait(free)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn slot(&self, index: usize, buffer: T) -> FrameSlot<T> {
        let sequence = self.inner.next_sequence.fetch_add(1, Ordering::Relaxed);
        FrameSlot {
            index,
            sequence,
            buffer: Some(buffer),
            pool: Arc::clone(&self.inner),
        }
    }
}

/// Exclusive ownership of one pool buffer for the lifetime of a frame.
pub struct FrameSlot<T> {
    index: usize,
    sequence: u64,
    buffer: Option<T>,
    pool: Arc<PoolInner<T>>,
}

impl<T> FrameSlot<T> {
    /// Pool slot index, in `0..capacity`.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Frame sequence number drawn at acquisition.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl<T> Deref for FrameSlot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `drop` takes the buffer out.
        self.buffer.as_ref().expect("frame slot buffer present")
    }
}

impl<T> DerefMut for FrameSlot<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.buffer.as_mut().expect("frame slot buffer present")
    }
}

impl<T> Drop for FrameSlot<T> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.lock().push_back((self.index, buffer));
            self.pool.returned.notify_one();
        }
    }
}
