//! Top-level configuration and TOML loading.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::{RenderConfig, ScheduleConfig, SpectrumConfig, TraceParams};
use crate::error::ConfigError;

/// Complete startup configuration; fixed once the visualizer is built.
///
/// Every section is optional in the file and falls back to the reference values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub trace: TraceParams,
    pub schedule: ScheduleConfig,
    pub spectrum: SpectrumConfig,
    pub render: RenderConfig,
}

impl Config {
    /// Load a TOML configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trace.validate()?;
        self.spectrum.validate()?;
        self.render.validate()
    }
}
