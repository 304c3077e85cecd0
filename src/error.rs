//! Error types for configuration, audio and rendering.
//!
//! None of these reach the tick/render hot path: audio problems degrade to a
//! silent source and frame errors are logged and skipped.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio {0} device found")]
    NoDevice(&'static str),

    #[error("failed to query device config: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to control audio stream: {0}")]
    Stream(String),

    #[error("unsupported sample format {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("{0} contains no samples")]
    Empty(PathBuf),

    #[error("failed to spawn analyser thread: {0}")]
    Thread(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported {0}")]
    IncompatibleSurface(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
