//! Trace geometry parameters: slice width, scroll step, retention and fold mapping.

use serde::Deserialize;
use std::ops::Range;

use crate::error::ConfigError;

/// Upper bound on live slices; keeps a misconfigured step from reserving gigabytes.
const MAX_LIFESPAN_TICKS: usize = 1 << 16;

/// One trace vertex is three f32 coordinates
const VERTEX_BYTES: u64 = 3 * 4;

/// Trace index buffers hold u32 indices
const INDEX_BYTES: u64 = 4;

/// Piecewise index fold from a narrow spectrum onto a wide height row.
///
/// The left band reads bins backwards (`left_offset - i`), the right band reads
/// them forwards (`i - right_offset`), so a monotonic spectrum renders as a
/// symmetric ridge peaking at the centre. The constants are empirical and are
/// not derived from the bin count.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FoldMapping {
    /// Height indices that read mirrored bins
    /// Reference value: 39..100
    pub left: Range<usize>,

    /// Mirrored band reads bin `left_offset - i`
    /// Reference value: 102
    pub left_offset: usize,

    /// Height indices that read bins in order
    /// Reference value: 100..161
    pub right: Range<usize>,

    /// Forward band reads bin `i - right_offset`
    /// Reference value: 97
    pub right_offset: usize,

    /// Power-law exponent applied to every magnitude (perceptual compression)
    /// Reference value: 1.2
    pub exponent: f32,
}

impl Default for FoldMapping {
    fn default() -> Self {
        Self {
            left: 39..100,
            left_offset: 102,
            right: 100..161,
            right_offset: 97,
            exponent: 1.2,
        }
    }
}

impl FoldMapping {
    /// Source bin for height index `i`, if `i` falls inside either band.
    ///
    /// The bin may still be out of range for a given spectrum; callers check.
    pub fn source_bin(&self, i: usize) -> Option<usize> {
        if self.left.contains(&i) {
            self.left_offset.checked_sub(i)
        } else if self.right.contains(&i) {
            i.checked_sub(self.right_offset)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.exponent.is_finite() || self.exponent <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "fold exponent must be a positive number, got {}",
                self.exponent
            )));
        }
        Ok(())
    }
}

/// Geometry and lifecycle of the receding slice stack
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TraceParams {
    /// Sample points per slice (W)
    /// Reference value: 200
    pub slice_width: usize,

    /// Depth units every slice recedes per tick
    /// Reference value: 1.0
    pub step: f32,

    /// Slices are evicted once depth <= -retention_bound
    /// Reference value: 1000.0
    pub retention_bound: f32,

    /// Sub-range of the slice drawn as the outline ("trim" view)
    /// Defaults to the full slice; clamped to `slice_width`
    pub outline: Option<Range<usize>>,

    pub fold: FoldMapping,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            slice_width: 200,
            step: 1.0,
            retention_bound: 1000.0,
            outline: None,
            fold: FoldMapping::default(),
        }
    }
}

impl TraceParams {
    /// Number of ticks a slice survives: the smallest `n` with `n * step >= bound`.
    ///
    /// This is also the ring capacity, since at most one slice is born per tick.
    ///
    /// Parameters that `validate` rejects (non-positive or non-finite step or
    /// bound) give 1; ratios past the slice limit are capped at the limit.
    pub fn lifespan_ticks(&self) -> usize {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.step) || !positive(self.retention_bound) {
            return 1;
        }
        let ratio = self.retention_bound / self.step;
        if !ratio.is_finite() || ratio > MAX_LIFESPAN_TICKS as f32 {
            return MAX_LIFESPAN_TICKS;
        }

        let mut n = ratio.ceil().max(1.0) as usize;
        // Float rounding can leave ceil() one off either way; settle on the exact predicate.
        while n > 1 && self.is_expired(n - 1) {
            n -= 1;
        }
        while n < MAX_LIFESPAN_TICKS && !self.is_expired(n) {
            n += 1;
        }
        n
    }

    /// Bytes of the largest per-trace GPU buffer (the fill vertices or fill indices)
    pub fn geometry_bytes(&self) -> u64 {
        let slices = self.lifespan_ticks() as u64;
        let width = self.slice_width as u64;
        let vertex_bytes = slices
            .saturating_mul(width)
            .saturating_mul(2 * VERTEX_BYTES);
        let index_bytes = slices
            .saturating_mul(width.saturating_sub(1))
            .saturating_mul(6 * INDEX_BYTES);
        vertex_bytes.max(index_bytes)
    }

    /// True once a slice of the given age (in ticks) has crossed the retention bound.
    pub fn is_expired(&self, age: usize) -> bool {
        age as f32 * self.step >= self.retention_bound
    }

    /// Depth of a slice of the given age.
    pub fn depth_at(&self, age: usize) -> f32 {
        -(age as f32 * self.step)
    }

    /// Outline range clamped to the slice width.
    pub fn outline_range(&self) -> Range<usize> {
        match &self.outline {
            Some(range) => range.start.min(self.slice_width)..range.end.min(self.slice_width),
            None => 0..self.slice_width,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slice_width < 2 {
            return Err(ConfigError::Invalid(format!(
                "slice width must be at least 2, got {}",
                self.slice_width
            )));
        }
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "scroll step must be a positive number, got {}",
                self.step
            )));
        }
        if !self.retention_bound.is_finite() || self.retention_bound <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "retention bound must be a positive number, got {}",
                self.retention_bound
            )));
        }
        let ratio = self.retention_bound / self.step;
        if ratio > MAX_LIFESPAN_TICKS as f32 {
            return Err(ConfigError::Invalid(format!(
                "retention bound / step = {} exceeds the {} slice limit",
                ratio, MAX_LIFESPAN_TICKS
            )));
        }
        let max_buffer = wgpu::Limits::default().max_buffer_size;
        if self.geometry_bytes() > max_buffer {
            return Err(ConfigError::Invalid(format!(
                "{} slices of width {} need {} bytes of geometry, over the {} byte GPU buffer limit",
                self.lifespan_ticks(),
                self.slice_width,
                self.geometry_bytes(),
                max_buffer
            )));
        }
        self.fold.validate()
    }
}

/// Ingestion cadence, independent of the render callback rate
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Minimum time between ticks (milliseconds)
    /// Reference value: 5 (= at most 200 ticks per second)
    pub min_tick_interval_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_tick_interval_ms: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_lifespan() {
        let params = TraceParams::default();
        assert_eq!(params.lifespan_ticks(), 1000);
        assert!(!params.is_expired(999));
        assert!(params.is_expired(1000));
    }

    #[test]
    fn test_lifespan_with_fractional_step() {
        let params = TraceParams {
            step: 0.3,
            retention_bound: 1.0,
            ..Default::default()
        };
        // 0.0, 0.3, 0.6, 0.9 are alive; 1.2 is gone
        assert_eq!(params.lifespan_ticks(), 4);
    }

    #[test]
    fn test_lifespan_when_step_exceeds_bound() {
        let params = TraceParams {
            step: 5.0,
            retention_bound: 2.0,
            ..Default::default()
        };
        assert_eq!(params.lifespan_ticks(), 1);
    }

    #[test]
    fn test_fold_source_bins() {
        let fold = FoldMapping::default();
        assert_eq!(fold.source_bin(38), None);
        assert_eq!(fold.source_bin(39), Some(63));
        assert_eq!(fold.source_bin(99), Some(3));
        assert_eq!(fold.source_bin(100), Some(3));
        assert_eq!(fold.source_bin(160), Some(63));
        assert_eq!(fold.source_bin(161), None);
    }

    #[test]
    fn test_outline_range_is_clamped() {
        let params = TraceParams {
            slice_width: 50,
            outline: Some(10..400),
            ..Default::default()
        };
        assert_eq!(params.outline_range(), 10..50);
        assert_eq!(TraceParams::default().outline_range(), 0..200);
    }

    #[test]
    fn test_validate_rejects_bad_step() {
        let mut params = TraceParams::default();
        params.step = 0.0;
        assert!(params.validate().is_err());
        params.step = f32::NAN;
        assert!(params.validate().is_err());
        params.step = 1e-9;
        assert!(params.validate().is_err(), "huge lifespan must be rejected");
    }

    #[test]
    fn test_lifespan_of_unvalidated_params_terminates() {
        let mut params = TraceParams::default();
        params.step = 0.0;
        assert_eq!(params.lifespan_ticks(), 1);
        params.step = f32::NAN;
        assert_eq!(params.lifespan_ticks(), 1);
        params.step = -1.0;
        assert_eq!(params.lifespan_ticks(), 1);

        params.step = 1.0;
        params.retention_bound = f32::INFINITY;
        assert_eq!(params.lifespan_ticks(), 1);

        params.retention_bound = 1000.0;
        params.step = 1e-9;
        assert_eq!(params.lifespan_ticks(), MAX_LIFESPAN_TICKS);
    }

    #[test]
    fn test_geometry_bytes_reference() {
        // 1000 slices * 200 points * 2 rows * 12 bytes
        assert_eq!(TraceParams::default().geometry_bytes(), 4_800_000);
    }

    #[test]
    fn test_validate_rejects_geometry_over_gpu_limit() {
        // 62500 slices: ~300 MB of fill vertices
        let params = TraceParams {
            step: 0.016,
            ..Default::default()
        };
        assert_eq!(params.lifespan_ticks(), 62500);
        let err = params.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let wide = TraceParams {
            slice_width: 1_000_000,
            ..Default::default()
        };
        assert!(wide.validate().is_err());

        let dense_but_fits = TraceParams {
            step: 0.1,
            ..Default::default()
        };
        assert!(dense_but_fits.validate().is_ok());
    }
}
