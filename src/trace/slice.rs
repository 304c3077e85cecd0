//! A single height profile positioned along the receding axis.

use std::ops::Range;

/// One spectrum snapshot: `width` heights at a shared depth.
///
/// Slices live in slots of the [`TraceBuffer`](super::TraceBuffer) arena and
/// are only ever handed out by reference, so nothing can hold one across an
/// eviction.
#[derive(Debug, Clone)]
pub struct Slice {
    heights: Box<[f32]>,
    age: usize,
    depth: f32,
}

impl Slice {
    pub(crate) fn new(width: usize) -> Self {
        Self {
            heights: vec![0.0; width].into_boxed_slice(),
            age: 0,
            depth: 0.0,
        }
    }

    /// Height at every sample point, indexed by position 0..width
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn width(&self) -> usize {
        self.heights.len()
    }

    /// Ticks elapsed since creation
    pub fn age(&self) -> usize {
        self.age
    }

    /// Position along the receding axis; 0 at creation, decreasing every tick
    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// Outline view over a sub-range of the same heights.
    pub fn outline(&self, range: Range<usize>) -> Outline<'_> {
        let end = range.end.min(self.heights.len());
        let start = range.start.min(end);
        Outline {
            start,
            heights: &self.heights[start..end],
            depth: self.depth,
        }
    }

    /// Reuse this slot for a newborn slice; returns the height row to fill.
    pub(crate) fn reset(&mut self) -> &mut [f32] {
        self.age = 0;
        self.depth = 0.0;
        &mut self.heights
    }

    pub(crate) fn set_age(&mut self, age: usize, depth: f32) {
        self.age = age;
        self.depth = depth;
    }
}

/// Borrowed outline ("trim") view of a slice.
///
/// Reads the slice's own height row and depth, so it cannot drift from the fill.
#[derive(Debug, Clone, Copy)]
pub struct Outline<'a> {
    start: usize,
    heights: &'a [f32],
    depth: f32,
}

impl<'a> Outline<'a> {
    /// Position index of the first outline point within the slice
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn heights(&self) -> &'a [f32] {
        self.heights
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// `(position index, height)` pairs in slice order
    pub fn points(&self) -> impl Iterator<Item = (usize, f32)> + 'a {
        let start = self.start;
        self.heights
            .iter()
            .enumerate()
            .map(move |(offset, &h)| (start + offset, h))
    }
}
