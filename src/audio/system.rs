//! Audio system managing playback/capture streams and spectrum analysis.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

use super::analyser::{SampleTap, SpectrumAnalyser};
use super::wav::{load_wav, LoopPlayer};
use super::FrequencySource;
use crate::error::AudioError;
use crate::params::SpectrumConfig;
use crate::playback::Transport;

/// Where the analysed signal comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioInput {
    /// Loop a WAV file through the default output device (starts paused)
    File(PathBuf),
    /// Capture the default input device (starts playing)
    Microphone,
}

/// Shared play/pause flag read by the audio callback.
///
/// While paused, file playback outputs silence and both inputs feed silence
/// to the analyser.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    playing: Arc<AtomicBool>,
}

impl PlaybackHandle {
    pub fn new(playing: bool) -> Self {
        Self {
            playing: Arc::new(AtomicBool::new(playing)),
        }
    }
}

impl Transport for PlaybackHandle {
    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    fn play(&mut self) {
        self.playing.store(true, Ordering::Relaxed);
    }

    fn pause(&mut self) {
        self.playing.store(false, Ordering::Relaxed);
    }
}

/// Audio system managing the cpal stream and analyser thread
pub struct AudioSystem {
    analyser: SpectrumAnalyser,
    playback: PlaybackHandle,

    /// Audio stream (kept alive)
    _stream: cpal::Stream,
}

impl AudioSystem {
    /// Open the requested input and start analysing it
    pub fn start(input: &AudioInput, config: &SpectrumConfig) -> Result<Self, AudioError> {
        let tap = SampleTap::new(config.history_len());

        let (stream, playback) = match input {
            AudioInput::File(path) => start_file(path, tap.clone())?,
            AudioInput::Microphone => start_microphone(tap.clone())?,
        };

        stream
            .play()
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        let analyser = SpectrumAnalyser::spawn(config, tap)?;

        Ok(Self {
            analyser,
            playback,
            _stream: stream,
        })
    }

    /// Handle for toggling playback from the UI thread
    pub fn playback(&self) -> PlaybackHandle {
        self.playback.clone()
    }
}

impl FrequencySource for AudioSystem {
    fn bin_count(&self) -> usize {
        self.analyser.bin_count()
    }

    fn sample(&mut self) -> Option<&[f32]> {
        self.analyser.sample()
    }
}

fn start_file(path: &Path, tap: SampleTap) -> Result<(cpal::Stream, PlaybackHandle), AudioError> {
    let audio = load_wav(path)?;

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::NoDevice("output"))?;
    let supported = device.default_output_config()?;
    let config: cpal::StreamConfig = supported.config();

    info!(
        "Audio: {} @ {}Hz, playing {} ({:.1}s @ {}Hz)",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        config.sample_rate.0,
        path.display(),
        audio.duration_secs(),
        audio.sample_rate
    );

    let player = LoopPlayer::new(&audio, config.sample_rate.0);
    let playback = PlaybackHandle::new(false);
    let flag = playback.clone();

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_playback::<f32>(&device, &config, player, tap, flag)?,
        cpal::SampleFormat::I16 => build_playback::<i16>(&device, &config, player, tap, flag)?,
        cpal::SampleFormat::U16 => build_playback::<u16>(&device, &config, player, tap, flag)?,
        cpal::SampleFormat::I32 => build_playback::<i32>(&device, &config, player, tap, flag)?,
        other => return Err(AudioError::UnsupportedFormat(other)),
    };

    Ok((stream, playback))
}

fn start_microphone(tap: SampleTap) -> Result<(cpal::Stream, PlaybackHandle), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AudioError::NoDevice("input"))?;
    let supported = device.default_input_config()?;
    let config: cpal::StreamConfig = supported.config();

    info!(
        "Audio: capturing {} @ {}Hz",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        config.sample_rate.0
    );

    let playback = PlaybackHandle::new(true);
    let flag = playback.clone();

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_capture::<f32>(&device, &config, tap, flag)?,
        cpal::SampleFormat::I16 => build_capture::<i16>(&device, &config, tap, flag)?,
        cpal::SampleFormat::U16 => build_capture::<u16>(&device, &config, tap, flag)?,
        cpal::SampleFormat::I32 => build_capture::<i32>(&device, &config, tap, flag)?,
        other => return Err(AudioError::UnsupportedFormat(other)),
    };

    Ok((stream, playback))
}

/// Build audio output stream looping the clip into every channel
fn build_playback<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut player: LoopPlayer,
    tap: SampleTap,
    playback: PlaybackHandle,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let mut mono = Vec::with_capacity(4096);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let playing = playback.is_playing();
            mono.clear();

            for frame in data.chunks_mut(channels) {
                let s = if playing { player.next_sample() } else { 0.0 };
                frame.fill(T::from_sample(s));
                mono.push(s); // Accumulate for spectrum analysis
            }

            tap.push(&mono);
        },
        |err| error!("audio output stream error: {}", err),
        None,
    )?;

    Ok(stream)
}

/// Build audio input stream downmixing captured frames into the tap
fn build_capture<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    tap: SampleTap,
    playback: PlaybackHandle,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let mut mono = Vec::with_capacity(4096);

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let playing = playback.is_playing();
            mono.clear();

            for frame in data.chunks(channels) {
                let s = if playing {
                    frame.iter().map(|v| v.to_sample::<f32>()).sum::<f32>() / channels as f32
                } else {
                    0.0
                };
                mono.push(s);
            }

            tap.push(&mono);
        },
        |err| error!("audio input stream error: {}", err),
        None,
    )?;

    Ok(stream)
}
