//! Audio input and spectrum analysis.
//!
//! Plays a WAV file (or captures the microphone) through cpal, feeds the
//! signal to a background analyser, and exposes the newest spectrum through
//! the [`FrequencySource`] trait.

mod analyser;
mod system;
mod wav;

// Re-export public types
pub use analyser::{blackman_window, ByteSpectrum, SampleTap, SpectrumAnalyser};
pub use system::{AudioInput, AudioSystem, PlaybackHandle};
pub use wav::{decode, downmix, load_wav, DecodedAudio, LoopPlayer};

/// Supplies the current frequency-magnitude spectrum on demand.
///
/// Reads must not block. `None` means no spectrum is available yet; callers
/// treat it like silence.
pub trait FrequencySource {
    /// Length of every spectrum this source returns (F)
    fn bin_count(&self) -> usize;

    fn sample(&mut self) -> Option<&[f32]>;
}

impl<S: FrequencySource + ?Sized> FrequencySource for Box<S> {
    fn bin_count(&self) -> usize {
        (**self).bin_count()
    }

    fn sample(&mut self) -> Option<&[f32]> {
        (**self).sample()
    }
}

/// Source used when no audio is available: always all-zero
#[derive(Debug, Clone)]
pub struct SilentSource {
    bins: Vec<f32>,
}

impl SilentSource {
    pub fn new(bin_count: usize) -> Self {
        Self {
            bins: vec![0.0; bin_count],
        }
    }
}

impl FrequencySource for SilentSource {
    fn bin_count(&self) -> usize {
        self.bins.len()
    }

    fn sample(&mut self) -> Option<&[f32]> {
        Some(&self.bins)
    }
}
