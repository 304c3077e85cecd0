//! Per-frame driver tying the frequency source, scheduler and scroll engine together.

use std::time::Duration;

use crate::audio::FrequencySource;
use crate::error::ConfigError;
use crate::params::Config;
use crate::rendering::TraceRenderer;
use crate::trace::{ScrollEngine, TickScheduler, TraceBuffer};

/// Owns everything the render loop needs between callbacks
pub struct Visualizer<S: FrequencySource> {
    engine: ScrollEngine,
    scheduler: TickScheduler,
    source: S,
}

impl<S: FrequencySource> Visualizer<S> {
    /// Build from a validated configuration; the engine is sized for the source's bins
    pub fn new(config: &Config, source: S) -> Result<Self, ConfigError> {
        config.validate()?;

        let engine = ScrollEngine::new(config.trace.clone(), source.bin_count())?;
        let scheduler = TickScheduler::from_config(&config.schedule);

        Ok(Self {
            engine,
            scheduler,
            source,
        })
    }

    /// Handle one render callback at time `now` since start.
    ///
    /// Ticks first when the scheduler allows it, then always draws. Returns
    /// whether a tick happened.
    pub fn frame<R: TraceRenderer + ?Sized>(&mut self, now: Duration, renderer: &mut R) -> bool {
        let ticked = self.update(now);
        renderer.draw(self.engine.buffer());
        ticked
    }

    /// Tick if due without drawing
    pub fn update(&mut self, now: Duration) -> bool {
        if !self.scheduler.maybe_tick(now) {
            return false;
        }
        let sample = self.source.sample();
        self.engine.tick(sample);
        true
    }

    pub fn buffer(&self) -> &TraceBuffer {
        self.engine.buffer()
    }

    pub fn engine(&self) -> &ScrollEngine {
        &self.engine
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentSource;

    /// Records what each draw call saw
    #[derive(Default)]
    struct RecordingRenderer {
        frames: Vec<(usize, Option<f32>)>,
    }

    impl TraceRenderer for RecordingRenderer {
        fn draw(&mut self, buffer: &TraceBuffer) {
            let newest_peak = buffer
                .newest()
                .map(|s| s.heights().iter().copied().fold(0.0, f32::max));
            self.frames.push((buffer.len(), newest_peak));
        }
    }

    /// Emits a spike at one bin and counts reads
    struct SpikeSource {
        bins: Vec<f32>,
        reads: usize,
    }

    impl SpikeSource {
        fn new(bin_count: usize, bin: usize, value: f32) -> Self {
            let mut bins = vec![0.0; bin_count];
            bins[bin] = value;
            Self { bins, reads: 0 }
        }
    }

    impl FrequencySource for SpikeSource {
        fn bin_count(&self) -> usize {
            self.bins.len()
        }

        fn sample(&mut self) -> Option<&[f32]> {
            self.reads += 1;
            Some(&self.bins)
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_draws_every_frame_ticks_when_due() {
        let mut visualizer =
            Visualizer::new(&Config::default(), SpikeSource::new(64, 50, 4.0)).unwrap();
        let mut renderer = RecordingRenderer::default();

        // 2 ms callbacks: ticks at 0, 6 and 12 ms only
        let ticked: Vec<bool> = (0..7)
            .map(|i| visualizer.frame(ms(i * 2), &mut renderer))
            .collect();

        assert_eq!(
            ticked,
            vec![true, false, false, true, false, false, true]
        );
        assert_eq!(renderer.frames.len(), 7);
        assert_eq!(visualizer.source().reads, 3);
        assert_eq!(visualizer.buffer().len(), 3);
    }

    #[test]
    fn test_draw_sees_completed_tick() {
        let mut visualizer =
            Visualizer::new(&Config::default(), SpikeSource::new(64, 50, 4.0)).unwrap();
        let mut renderer = RecordingRenderer::default();

        visualizer.frame(ms(0), &mut renderer);

        let (len, peak) = renderer.frames[0];
        assert_eq!(len, 1);
        let peak = peak.unwrap();
        assert!((peak - 5.278).abs() < 1e-3, "peak = {}", peak);
        assert_eq!(visualizer.buffer().newest().unwrap().depth(), 0.0);
    }

    #[test]
    fn test_silent_source_gives_flat_slices() {
        let mut visualizer = Visualizer::new(&Config::default(), SilentSource::new(64)).unwrap();
        let mut renderer = RecordingRenderer::default();

        for i in 0..20 {
            visualizer.frame(ms(i * 10), &mut renderer);
        }

        assert_eq!(visualizer.engine().ticks(), 20);
        assert!(renderer.frames.iter().all(|&(_, peak)| peak == Some(0.0)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.trace.step = 0.0;
        assert!(Visualizer::new(&config, SilentSource::new(64)).is_err());
    }

    #[test]
    fn test_boxed_source_and_dyn_renderer() {
        let source: Box<dyn FrequencySource> = Box::new(SilentSource::new(64));
        let mut visualizer = Visualizer::new(&Config::default(), source).unwrap();
        let mut renderer = RecordingRenderer::default();
        let renderer: &mut dyn TraceRenderer = &mut renderer;

        assert!(visualizer.frame(ms(0), renderer));
        assert_eq!(visualizer.buffer().len(), 1);
    }
}
