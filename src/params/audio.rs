//! Spectrum analysis configuration.

use serde::Deserialize;

use crate::error::ConfigError;

/// Spectrum analyser configuration (web-audio style byte spectrum)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// FFT window size (power of 2, 32..=32768)
    /// Reference value: 128 (= 64 magnitude bins)
    pub fft_size: usize,

    /// Analyser refresh interval (milliseconds)
    pub update_interval_ms: u64,

    /// Temporal smoothing between analyser frames, 0 = none, <1
    /// Reference value: 0.8
    pub smoothing: f32,

    /// Magnitude mapped to 0 in the byte spectrum (dB)
    /// Reference value: -100
    pub min_decibels: f32,

    /// Magnitude mapped to 255 in the byte spectrum (dB)
    /// Reference value: -30
    pub max_decibels: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            fft_size: 128,
            update_interval_ms: 5,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl SpectrumConfig {
    /// Number of magnitude bins the analyser produces (F)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Samples retained for analysis; older samples are dropped
    pub fn history_len(&self) -> usize {
        self.fft_size * 4
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(ConfigError::Invalid(format!(
                "FFT size must be a power of 2 in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(ConfigError::Invalid(format!(
                "smoothing must be in [0, 1), got {}",
                self.smoothing
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(ConfigError::Invalid(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bins() {
        let config = SpectrumConfig::default();
        assert_eq!(config.bin_count(), 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_fft_size() {
        let mut config = SpectrumConfig::default();
        config.fft_size = 100;
        assert!(config.validate().is_err());
        config.fft_size = 16;
        assert!(config.validate().is_err());
        config.fft_size = 32;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_decibel_range() {
        let config = SpectrumConfig {
            min_decibels: -30.0,
            max_decibels: -100.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
