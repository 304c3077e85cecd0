//! wavetrail library - scrolling spectrum trace driven by live audio

pub mod audio;
pub mod camera;
pub mod cli;
pub mod error;
pub mod logging;
pub mod params;
pub mod playback;
pub mod rendering;
pub mod trace;
pub mod viewport;
pub mod visualizer;
