//! Fold a magnitude spectrum into a slice height profile.

use crate::params::FoldMapping;

/// Power-law compression used for every height.
///
/// Negative and non-finite magnitudes are treated as silence.
pub fn compress(magnitude: f32, exponent: f32) -> f32 {
    if !magnitude.is_finite() || magnitude <= 0.0 {
        return 0.0;
    }
    magnitude.powf(exponent)
}

/// Pure mapping from one magnitude array to one height row
#[derive(Debug, Clone)]
pub struct SliceBuilder {
    fold: FoldMapping,
    bin_count: usize,
    width: usize,
}

impl SliceBuilder {
    /// Create a builder for spectra of `bin_count` bins and rows of `width` points
    pub fn new(fold: FoldMapping, bin_count: usize, width: usize) -> Self {
        Self {
            fold,
            bin_count,
            width,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Build a fresh height row.
    pub fn build(&self, magnitudes: Option<&[f32]>) -> Vec<f32> {
        let mut heights = vec![0.0; self.width];
        self.build_into(magnitudes, &mut heights);
        heights
    }

    /// Overwrite `heights` with the profile for `magnitudes`.
    ///
    /// A missing spectrum, or one whose length differs from `bin_count`,
    /// yields a flat row.
    pub fn build_into(&self, magnitudes: Option<&[f32]>, heights: &mut [f32]) {
        heights.fill(0.0);

        let Some(magnitudes) = magnitudes.filter(|m| m.len() == self.bin_count) else {
            return;
        };

        for (i, h) in heights.iter_mut().enumerate() {
            if let Some(&m) = self.fold.source_bin(i).and_then(|bin| magnitudes.get(bin)) {
                *h = compress(m, self.fold.exponent);
            }
        }
    }
}
