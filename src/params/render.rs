//! Rendering configuration: window, viewport, camera and colours.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::viewport::DEFAULT_VIEWPORT_SCALE;

/// Orthographic camera framing the receding slice stack
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrthoCamera {
    /// View-space frustum extents (world units)
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,

    /// Clip planes (world units along the view direction)
    pub near: f32,
    pub far: f32,

    /// Camera position
    pub eye: [f32; 3],

    /// Look-at target
    pub target: [f32; 3],
}

impl Default for OrthoCamera {
    fn default() -> Self {
        Self {
            left: -550.0,
            right: -250.0,
            top: 1200.0,
            bottom: -200.0,
            near: 200.0,
            far: 5000.0,
            eye: [400.0, 1000.0, 300.0],
            target: [400.0, 0.0, 0.0],
        }
    }
}

/// Rendering configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Initial window width (pixels)
    pub window_width: u32,

    /// Initial window height (pixels)
    pub window_height: u32,

    /// Square viewport side as a fraction of the smaller window dimension
    /// Reference value: 0.66
    pub viewport_scale: f32,

    pub camera: OrthoCamera,

    /// Background clear colour (sRGB)
    pub clear_color: [f32; 3],

    /// Slice fill colour, drawn opaque (sRGB)
    pub fill_color: [f32; 3],

    /// Outline colour and opacity (sRGB + alpha)
    /// Reference value: #e1e1e1 at 0.57
    pub outline_color: [f32; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            viewport_scale: DEFAULT_VIEWPORT_SCALE,
            camera: OrthoCamera::default(),
            clear_color: [0.0, 0.0, 0.0],
            fill_color: [0.0, 0.0, 0.0],
            outline_color: [225.0 / 255.0, 225.0 / 255.0, 225.0 / 255.0, 0.57],
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.viewport_scale > 0.0 && self.viewport_scale <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "viewport scale must be in (0, 1], got {}",
                self.viewport_scale
            )));
        }
        let cam = &self.camera;
        if cam.left == cam.right || cam.top == cam.bottom || cam.near >= cam.far {
            return Err(ConfigError::Invalid(
                "camera frustum has zero extent".to_string(),
            ));
        }
        if cam.eye == cam.target {
            return Err(ConfigError::Invalid(
                "camera eye and target coincide".to_string(),
            ));
        }
        Ok(())
    }
}
