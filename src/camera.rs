//! Fixed orthographic camera looking down the receding slice stack.

use glam::{Mat4, Vec3};

use crate::params::OrthoCamera;

/// Camera system producing the view-projection for the trace
pub struct CameraSystem {
    camera: OrthoCamera,
}

impl CameraSystem {
    pub fn new(camera: OrthoCamera) -> Self {
        Self { camera }
    }

    /// Camera position and look-at target
    pub fn position_and_target(&self) -> (Vec3, Vec3) {
        (
            Vec3::from_array(self.camera.eye),
            Vec3::from_array(self.camera.target),
        )
    }

    /// Create view-projection matrix for rendering
    ///
    /// The frustum is fixed in world units, so the matrix does not depend on
    /// the window size; the square viewport keeps the aspect ratio at 1.
    pub fn create_view_proj_matrix(&self) -> Mat4 {
        let (eye, target) = self.position_and_target();
        let c = &self.camera;

        // Always keep Y as up vector (camera never rolls)
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let proj = Mat4::orthographic_rh(c.left, c.right, c.bottom, c.top, c.near, c.far);

        proj * view
    }
}
