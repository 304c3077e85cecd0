//! Per-tick scroll transition: advance, evict, insert.

use tracing::trace;

use super::buffer::TraceBuffer;
use super::builder::SliceBuilder;
use crate::error::ConfigError;
use crate::params::TraceParams;

/// Outcome of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Slices removed for crossing the retention bound
    pub evicted: usize,
    /// Live slices after insertion
    pub live: usize,
}

/// Owns the trace buffer and applies the tick transition to it
#[derive(Debug)]
pub struct ScrollEngine {
    params: TraceParams,
    builder: SliceBuilder,
    buffer: TraceBuffer,
    ticks: u64,
}

impl ScrollEngine {
    /// Create an engine for spectra of `bin_count` bins
    pub fn new(params: TraceParams, bin_count: usize) -> Result<Self, ConfigError> {
        params.validate()?;

        let builder = SliceBuilder::new(params.fold.clone(), bin_count, params.slice_width);
        let buffer = TraceBuffer::new(&params);

        Ok(Self {
            params,
            builder,
            buffer,
            ticks: 0,
        })
    }

    /// Ingest one spectrum sample.
    ///
    /// Existing slices recede by one step, slices at or past the retention
    /// bound are evicted, then the new slice is appended at depth 0. The whole
    /// transition happens under one `&mut self`, so readers never see it half done.
    pub fn tick(&mut self, magnitudes: Option<&[f32]>) -> TickReport {
        self.buffer.advance(&self.params);
        let evicted = self.buffer.evict_expired(&self.params);

        let row = self.buffer.push_newest();
        self.builder.build_into(magnitudes, row);

        self.ticks += 1;
        let live = self.buffer.len();
        trace!(tick = self.ticks, evicted, live, "trace tick");

        TickReport { evicted, live }
    }

    /// Read-only view of the live slices
    pub fn buffer(&self) -> &TraceBuffer {
        &self.buffer
    }

    pub fn params(&self) -> &TraceParams {
        &self.params
    }

    pub fn builder(&self) -> &SliceBuilder {
        &self.builder
    }

    /// Ticks applied since creation
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
