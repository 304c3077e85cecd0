//! Fixed-capacity ring arena of live slices, ordered oldest to newest.

use super::slice::Slice;
use crate::params::TraceParams;

/// Ordered collection of live slices.
///
/// Slots are allocated once at construction and recycled on eviction. At most
/// one slice is born per tick and every slice lives exactly
/// `lifespan_ticks()` ticks, so the arena never needs to grow.
#[derive(Debug)]
pub struct TraceBuffer {
    slots: Vec<Slice>,
    /// Slot index of the oldest live slice
    head: usize,
    len: usize,
}

impl TraceBuffer {
    pub fn new(params: &TraceParams) -> Self {
        let capacity = params.lifespan_ticks();
        let slots = (0..capacity)
            .map(|_| Slice::new(params.slice_width))
            .collect();

        Self {
            slots,
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of simultaneously live slices
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live slices, oldest (most negative depth) first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Slice> + ExactSizeIterator + '_ {
        (0..self.len).map(move |i| &self.slots[self.slot_index(i)])
    }

    /// The slice at `position` in age order (0 = oldest)
    pub fn get(&self, position: usize) -> Option<&Slice> {
        (position < self.len).then(|| &self.slots[self.slot_index(position)])
    }

    pub fn oldest(&self) -> Option<&Slice> {
        self.get(0)
    }

    pub fn newest(&self) -> Option<&Slice> {
        self.len.checked_sub(1).and_then(|last| self.get(last))
    }

    /// Drop every slice without releasing slot storage
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Age every live slice by one tick.
    pub(crate) fn advance(&mut self, params: &TraceParams) {
        for i in 0..self.len {
            let idx = self.slot_index(i);
            let slice = &mut self.slots[idx];
            let age = slice.age() + 1;
            slice.set_age(age, params.depth_at(age));
        }
    }

    /// Evict every slice past the retention bound; returns how many were removed.
    ///
    /// Ages decrease from head to tail, so expired slices form a prefix and the
    /// scan stops at the first survivor.
    pub(crate) fn evict_expired(&mut self, params: &TraceParams) -> usize {
        let mut evicted = 0;
        while let Some(oldest) = self.oldest() {
            if !params.is_expired(oldest.age()) {
                break;
            }
            self.head = (self.head + 1) % self.capacity();
            self.len -= 1;
            evicted += 1;
        }
        evicted
    }

    /// Claim the next free slot as the newest slice and return its height row.
    pub(crate) fn push_newest(&mut self) -> &mut [f32] {
        debug_assert!(
            self.len < self.capacity(),
            "trace buffer overflow: eviction must run before insertion"
        );
        if self.len == self.capacity() {
            // Unreachable while ticks evict first; recycle the oldest rather than grow.
            self.head = (self.head + 1) % self.capacity();
            self.len -= 1;
        }
        let idx = self.slot_index(self.len);
        self.len += 1;
        self.slots[idx].reset()
    }

    fn slot_index(&self, position: usize) -> usize {
        (self.head + position) % self.slots.len()
    }
}
