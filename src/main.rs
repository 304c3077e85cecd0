//! wavetrail - scrolling 3D spectrum trace of live audio
//!
//! Every few milliseconds the current spectrum becomes a new slice at the
//! front of the trace; older slices recede until they fall off the far end.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use wavetrail::audio::{AudioInput, AudioSystem, FrequencySource, PlaybackHandle, SilentSource};
use wavetrail::cli::Args;
use wavetrail::logging::init_logging;
use wavetrail::params::Config;
use wavetrail::playback::PlaybackState;
use wavetrail::rendering::RenderSystem;
use wavetrail::visualizer::Visualizer;

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Trace state and its audio feed
    visualizer: Visualizer<Box<dyn FrequencySource>>,
    playback: Option<PlaybackHandle>,

    // Configuration
    config: Config,

    // Time tracking
    start_time: Instant,

    /// Fatal error raised inside the event loop, reported after it exits
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config, input: Option<AudioInput>) -> Result<Self> {
        let bins = config.spectrum.bin_count();
        let silent = || -> Box<dyn FrequencySource> { Box::new(SilentSource::new(bins)) };

        let (source, playback) = match input {
            Some(input) => match AudioSystem::start(&input, &config.spectrum) {
                Ok(audio) => {
                    let playback = audio.playback();
                    info!(
                        "Playback: {:?} (left click toggles)",
                        PlaybackState::of(&playback)
                    );
                    let source: Box<dyn FrequencySource> = Box::new(audio);
                    (source, Some(playback))
                }
                Err(e) => {
                    warn!("Audio unavailable ({}), continuing with silence", e);
                    (silent(), None)
                }
            },
            None => {
                info!("No audio input selected, tracing silence");
                (silent(), None)
            }
        };

        let visualizer = Visualizer::new(&config, source)?;

        Ok(Self {
            window: None,
            render_system: None,
            visualizer,
            playback,
            config,
            start_time: Instant::now(),
            error: None,
        })
    }

    /// Stop the event loop with an error to report from `main`
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        self.error = Some(err);
        event_loop.exit();
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("wavetrail")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.render.window_width,
                self.config.render.window_height,
            ));

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("failed to create window")?,
        );

        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            &self.config.render,
            &self.config.trace,
        ))
        .context("failed to initialize renderer")?;

        info!("Window ready; click to play/pause, Escape to quit");

        self.window = Some(window);
        self.render_system = Some(render_system);
        Ok(())
    }

    fn toggle_playback(&mut self) {
        if let Some(playback) = self.playback.as_mut() {
            let state = PlaybackState::toggle(playback);
            info!("Playback: {:?}", state);
        }
    }

    /// Tick if due, then draw
    fn render_frame(&mut self) {
        let Some(render_system) = self.render_system.as_mut() else {
            return;
        };
        let now = self.start_time.elapsed();
        self.visualizer.frame(now, render_system);
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        if let Err(e) = self.init_window(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.toggle_playback(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = self.render_system.as_mut() {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let config = args.load_config().context("invalid configuration")?;
    let mut app = App::new(config, args.audio_input())?;

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.run_app(&mut app).context("event loop failed")?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
