//! WAV decoding and looped, rate-converted playback.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::error::AudioError;

/// Mono PCM audio decoded to f32 in [-1, 1]
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Load a WAV file and downmix it to mono
pub fn load_wav(path: &Path) -> Result<DecodedAudio, AudioError> {
    let decode_err = |source| AudioError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let reader = hound::WavReader::open(path).map_err(decode_err)?;
    let audio = decode(reader).map_err(decode_err)?;

    if audio.samples.is_empty() {
        return Err(AudioError::Empty(path.to_path_buf()));
    }
    Ok(audio)
}

/// Decode any hound-supported PCM layout (int 8..32 bit, float 32 bit)
pub fn decode<R: Read>(reader: hound::WavReader<R>) -> Result<DecodedAudio, hound::Error> {
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(DecodedAudio {
        samples: downmix(&interleaved, spec.channels as usize).into(),
        sample_rate: spec.sample_rate,
    })
}

/// Average interleaved frames into one channel
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Endless playhead over a decoded clip with linear-interpolated rate conversion
#[derive(Debug, Clone)]
pub struct LoopPlayer {
    samples: Arc<[f32]>,
    position: f64,
    step: f64,
}

impl LoopPlayer {
    /// Play `audio` on a device running at `output_rate` Hz
    pub fn new(audio: &DecodedAudio, output_rate: u32) -> Self {
        Self {
            samples: Arc::clone(&audio.samples),
            position: 0.0,
            step: audio.sample_rate as f64 / output_rate.max(1) as f64,
        }
    }

    /// Next output sample; wraps to the start at the end of the clip
    pub fn next_sample(&mut self) -> f32 {
        let len = self.samples.len();
        if len == 0 {
            return 0.0;
        }

        let index = self.position as usize;
        let frac = (self.position - index as f64) as f32;
        let a = self.samples[index % len];
        let b = self.samples[(index + 1) % len];

        self.position += self.step;
        if self.position >= len as f64 {
            self.position -= len as f64;
        }

        a + (b - a) * frac
    }

    pub fn position(&self) -> f64 {
        self.position
    }
}
