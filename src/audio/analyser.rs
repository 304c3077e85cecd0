//! Spectrum analysis thread and byte-spectrum math.
//!
//! Mirrors the behaviour of a web-audio analyser node: Blackman window,
//! temporally smoothed magnitudes, decibel scaling into a 0..=255 range.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::Duration;
use tracing::debug;

use super::FrequencySource;
use crate::error::AudioError;
use crate::params::SpectrumConfig;

/// Lock a mutex, recovering the data if a panicking thread poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Bounded mono sample history shared between the audio callback and the analyser
#[derive(Clone)]
pub struct SampleTap {
    samples: Arc<Mutex<Vec<f32>>>,
    capacity: usize,
}

impl SampleTap {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(Vec::with_capacity(capacity * 2))),
            capacity,
        }
    }

    /// Append samples, dropping the oldest beyond capacity
    pub fn push(&self, samples: &[f32]) {
        let mut buf = lock(&self.samples);
        buf.extend_from_slice(samples);
        if buf.len() > self.capacity {
            let excess = buf.len() - self.capacity;
            buf.drain(..excess);
        }
    }

    /// Copy the newest `out.len()` samples into `out`, zero-padding at the front
    pub fn copy_latest(&self, out: &mut [f32]) {
        let buf = lock(&self.samples);
        let n = buf.len().min(out.len());
        let pad = out.len() - n;
        out[..pad].fill(0.0);
        out[pad..].copy_from_slice(&buf[buf.len() - n..]);
    }

    pub fn len(&self) -> usize {
        lock(&self.samples).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Blackman window function for FFT analysis
pub fn blackman_window(index: usize, size: usize) -> f32 {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    let x = index as f32 / size as f32;
    a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
}

/// Stateful spectrum computation (window, FFT, smoothing, byte scaling)
pub struct ByteSpectrum {
    config: SpectrumConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl ByteSpectrum {
    pub fn new(config: SpectrumConfig) -> Self {
        let size = config.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(size);
        let window = (0..size).map(|i| blackman_window(i, size)).collect();

        Self {
            fft,
            window,
            buffer: vec![Complex::new(0.0, 0.0); size],
            smoothed: vec![0.0; config.bin_count()],
            config,
        }
    }

    /// Analyse `fft_size` time-domain samples into `bin_count` byte-scaled magnitudes
    pub fn process(&mut self, samples: &[f32], out: &mut [f32]) {
        let size = self.config.fft_size;
        debug_assert_eq!(samples.len(), size);
        debug_assert_eq!(out.len(), self.config.bin_count());

        for ((slot, &s), &w) in self.buffer.iter_mut().zip(samples).zip(&self.window) {
            *slot = Complex::new(s * w, 0.0);
        }
        self.fft.process(&mut self.buffer);

        let tau = self.config.smoothing;
        let min_db = self.config.min_decibels;
        let range_db = self.config.max_decibels - min_db;

        let bins = self.smoothed.iter_mut().zip(&self.buffer).zip(out.iter_mut());
        for ((smoothed, bin), byte) in bins {
            let magnitude = bin.norm() / size as f32;
            let mut value = tau * *smoothed + (1.0 - tau) * magnitude;
            if !value.is_finite() {
                value = 0.0;
            }
            *smoothed = value;

            let db = 20.0 * value.log10();
            // log10(0) = -inf lands at 0 after the clamp
            *byte = (255.0 * (db - min_db) / range_db).floor().clamp(0.0, 255.0);
        }
    }
}

/// Spawn spectrum analysis thread
fn spawn_analyser_thread(
    config: SpectrumConfig,
    tap: SampleTap,
    latest: Arc<Mutex<Vec<f32>>>,
    running: Arc<AtomicBool>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("wavetrail-analyser".into())
        .spawn(move || {
            let interval = Duration::from_millis(config.update_interval_ms.max(1));
            let mut spectrum = ByteSpectrum::new(config.clone());
            let mut window = vec![0.0; config.fft_size];
            let mut bins = vec![0.0; config.bin_count()];

            while running.load(Ordering::Relaxed) {
                thread::sleep(interval);

                tap.copy_latest(&mut window);
                spectrum.process(&window, &mut bins);

                lock(&latest).copy_from_slice(&bins);
            }
            debug!("analyser thread stopped");
        })
}

/// Frequency source backed by a background analyser thread
pub struct SpectrumAnalyser {
    latest: Arc<Mutex<Vec<f32>>>,
    local: Vec<f32>,
    running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SpectrumAnalyser {
    /// Start analysing samples pushed into `tap`
    pub fn spawn(config: &SpectrumConfig, tap: SampleTap) -> Result<Self, AudioError> {
        let latest = Arc::new(Mutex::new(vec![0.0; config.bin_count()]));
        let running = Arc::new(AtomicBool::new(true));

        let thread = spawn_analyser_thread(
            config.clone(),
            tap,
            Arc::clone(&latest),
            Arc::clone(&running),
        )?;

        debug!(
            fft_size = config.fft_size,
            bins = config.bin_count(),
            "analyser started"
        );

        Ok(Self {
            local: vec![0.0; config.bin_count()],
            latest,
            running,
            thread: Some(thread),
        })
    }
}

impl FrequencySource for SpectrumAnalyser {
    fn bin_count(&self) -> usize {
        self.local.len()
    }

    /// Copy the newest spectrum without blocking; keeps the previous one on contention
    fn sample(&mut self) -> Option<&[f32]> {
        match self.latest.try_lock() {
            Ok(latest) => self.local.copy_from_slice(&latest),
            Err(TryLockError::Poisoned(poisoned)) => {
                self.local.copy_from_slice(&poisoned.into_inner())
            }
            Err(TryLockError::WouldBlock) => {}
        }
        Some(&self.local)
    }
}

impl Drop for SpectrumAnalyser {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blackman_window() {
        let size = 128;

        // Blackman window is ~0 at the edge and 1 at the centre
        assert!(blackman_window(0, size).abs() < 1e-6);
        assert!((blackman_window(size / 2, size) - 1.0).abs() < 1e-6);
        assert!(blackman_window(size / 4, size) < 1.0);
    }

    #[test]
    fn test_silence_gives_zero_bytes() {
        let mut spectrum = ByteSpectrum::new(SpectrumConfig::default());
        let mut out = vec![1.0; 64];
        spectrum.process(&[0.0; 128], &mut out);
        assert!(out.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_tone_peaks_at_its_bin() {
        // Widen the dB range so the main lobe does not clip
        let config = SpectrumConfig {
            smoothing: 0.0,
            max_decibels: 0.0,
            ..Default::default()
        };
        let mut spectrum = ByteSpectrum::new(config);

        // Exactly 8 cycles over the window lands in bin 8
        let samples: Vec<f32> = (0..128)
            .map(|i| (2.0 * PI * 8.0 * i as f32 / 128.0).sin())
            .collect();
        let mut out = vec![0.0; 64];
        spectrum.process(&samples, &mut out);

        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 8);
        assert!(out[8] > 200.0);
        assert!(out.iter().all(|&b| (0.0..=255.0).contains(&b)));
    }

    #[test]
    fn test_smoothing_decays_towards_silence() {
        let mut spectrum = ByteSpectrum::new(SpectrumConfig {
            max_decibels: 0.0,
            ..Default::default()
        });
        let tone: Vec<f32> = (0..128)
            .map(|i| (2.0 * PI * 8.0 * i as f32 / 128.0).sin())
            .collect();
        let mut out = vec![0.0; 64];

        spectrum.process(&tone, &mut out);
        let loud = out[8];
        spectrum.process(&[0.0; 128], &mut out);
        let fading = out[8];
        assert!(fading > 0.0 && fading < loud);
    }

    #[test]
    fn test_tap_keeps_newest_samples() {
        let tap = SampleTap::new(4);
        tap.push(&[1.0, 2.0, 3.0]);
        tap.push(&[4.0, 5.0, 6.0]);
        assert_eq!(tap.len(), 4);

        let mut out = [0.0; 3];
        tap.copy_latest(&mut out);
        assert_eq!(out, [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_tap_zero_pads_short_history() {
        let tap = SampleTap::new(16);
        tap.push(&[7.0, 8.0]);
        let mut out = [9.0; 4];
        tap.copy_latest(&mut out);
        assert_eq!(out, [0.0, 0.0, 7.0, 8.0]);
    }

    #[test]
    fn test_analyser_reports_configured_bins() {
        let config = SpectrumConfig::default();
        let mut analyser = SpectrumAnalyser::spawn(&config, SampleTap::new(512)).unwrap();
        assert_eq!(analyser.bin_count(), 64);
        let sample = analyser.sample().unwrap();
        assert_eq!(sample.len(), 64);
        assert!(sample.iter().all(|&b| b == 0.0));
    }
}
