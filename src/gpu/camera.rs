//! Orbit/pan camera for viewing the lattice.

use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraSettings;

const ORBIT_SPEED: f32 = 0.3;
const PAN_SPEED: f32 = 0.004;
const ZOOM_SPEED: f32 = 0.1;
const FOV_Y_DEG: f32 = 45.0;

/// Camera that pans the lattice, then orbits it about its own origin.
#[derive(Clone, Debug)]
pub struct Camera {
    /// Rotation about x and y [deg].
    pub orbit: Vec2,
    pub pan: Vec3,
    pub eye_separation: f32,
    pub point_size: f32,
}

impl Camera {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            orbit: Vec2::new(settings.orbit_x, settings.orbit_y),
            pan: Vec3::new(settings.pan_x, settings.pan_y, settings.pan_z),
            eye_separation: settings.eye_separation,
            point_size: settings.point_size,
        }
    }

    /// Rotate by a mouse drag in pixels.
    pub fn rotate(&mut self, delta: Vec2) {
        self.orbit.y += delta.x * ORBIT_SPEED;
        self.orbit.x = (self.orbit.x + delta.y * ORBIT_SPEED).clamp(-90.0, 90.0);
    }

    /// Translate in the view plane by a mouse drag in pixels.
    pub fn translate(&mut self, delta: Vec2) {
        let scale = PAN_SPEED * self.pan.z.abs().max(0.1);
        self.pan.x += delta.x * scale;
        self.pan.y -= delta.y * scale;
    }

    /// Move towards (positive) or away from the lattice.
    pub fn zoom(&mut self, scroll: f32) {
        self.pan.z = (self.pan.z + scroll * ZOOM_SPEED).min(-0.05);
    }

    /// View matrix for an eye shifted horizontally by `eye_offset`.
    pub fn view_matrix(&self, eye_offset: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(-eye_offset, 0.0, 0.0))
            * Mat4::from_translation(self.pan)
            * Mat4::from_rotation_x(self.orbit.x.to_radians())
            * Mat4::from_rotation_y(self.orbit.y.to_radians())
    }

    pub fn view_proj(&self, aspect: f32, eye_offset: f32) -> Mat4 {
        let proj = Mat4::perspective_rh(FOV_Y_DEG.to_radians(), aspect, 0.01, 100.0);
        proj * self.view_matrix(eye_offset)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(&CameraSettings::default())
    }
}
