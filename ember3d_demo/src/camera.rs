//! Orbit camera supplying view/projection matrices to the renderer
//!
//! The renderer never sees this type; it only consumes the matrices
//! written into the per-frame uniform buffers.

use glam::{Mat4, Vec3};

/// Yaw/pitch camera at a world position
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    /// Radians around +Y; 0 looks down -Z
    pub yaw: f32,
    /// Radians above the horizon
    pub pitch: f32,
    pub fov_y: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.5, 4.0),
            yaw: 0.0,
            pitch: -0.3,
            fov_y: std::f32::consts::FRAC_PI_4,
            z_near: 0.1,
            z_far: 100.0,
        }
    }
}

impl Camera {
    /// Unit vector the camera looks along
    pub fn forward(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(-sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch).normalize()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    /// Right-handed projection with Y flipped for Vulkan clip space
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let mut proj = Mat4::perspective_rh(self.fov_y, aspect, self.z_near, self.z_far);
        proj.y_axis.y *= -1.0;
        proj
    }
}
