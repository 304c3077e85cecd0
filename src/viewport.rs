//! Square drawing region derived from the window size.

/// Fraction of the smaller window dimension used for the viewport side
pub const DEFAULT_VIEWPORT_SCALE: f32 = 0.66;

/// Square viewport anchored at the window origin (top-left), in physical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub side: f32,
}

impl Viewport {
    /// Fit the square: `side = min(width, height) * scale`, 0.66 by default
    pub fn fit(width: u32, height: u32, scale: f32) -> Self {
        let side = (width.min(height) as f32 * scale).floor();
        Self {
            x: 0.0,
            y: 0.0,
            side,
        }
    }

    /// A minimised window leaves nothing to draw into
    pub fn is_empty(&self) -> bool {
        self.side < 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_uses_smaller_dimension() {
        assert_eq!(Viewport::fit(1280, 720, DEFAULT_VIEWPORT_SCALE).side, 475.0);
        assert_eq!(Viewport::fit(500, 1000, DEFAULT_VIEWPORT_SCALE).side, 330.0);
        assert_eq!(Viewport::fit(1000, 1000, DEFAULT_VIEWPORT_SCALE).side, 660.0);
    }

    #[test]
    fn test_fit_is_anchored_at_origin() {
        let viewport = Viewport::fit(800, 600, DEFAULT_VIEWPORT_SCALE);
        assert_eq!((viewport.x, viewport.y), (0.0, 0.0));
    }

    #[test]
    fn test_zero_sized_window() {
        assert!(Viewport::fit(0, 720, DEFAULT_VIEWPORT_SCALE).is_empty());
        assert!(!Viewport::fit(2, 2, DEFAULT_VIEWPORT_SCALE).is_empty());
    }

    #[test]
    fn test_configured_default_scale() {
        let scale = crate::params::RenderConfig::default().viewport_scale;
        assert_eq!(Viewport::fit(1280, 720, scale), Viewport::fit(1280, 720, 0.66));
    }

    #[test]
    fn test_custom_scale() {
        assert_eq!(Viewport::fit(1000, 400, 1.0).side, 400.0);
    }
}
