//! Camera for 3D orbit view.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Mat4, Vec2, Vec3};

const ORBIT_SENSITIVITY: f32 = 0.005;
const PAN_SENSITIVITY: f32 = 0.002;
const ZOOM_SPEED: f32 = 0.1;
const MAX_ELEVATION: f32 = FRAC_PI_2 - 0.1;
const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 10.0;

/// Orbit camera in spherical coordinates around a movable target.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    /// Horizontal rotation angle in radians.
    pub azimuth: f32,
    /// Vertical rotation angle in radians.
    pub elevation: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl OrbitCamera {
    /// Camera behind the origin at distance 3, looking down +z.
    pub fn new() -> Self {
        Self {
            azimuth: PI,
            elevation: 0.0,
            distance: 3.0,
            target: Vec3::ZERO,
            fov_y: 45f32.to_radians(),
            near: 0.1,
            far: 10.0,
        }
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let cos_elevation = self.elevation.cos();
        self.target
            + self.distance
                * Vec3::new(
                    cos_elevation * self.azimuth.sin(),
                    self.elevation.sin(),
                    cos_elevation * self.azimuth.cos(),
                )
    }

    /// Rotate by a pointer delta in pixels.
    pub fn orbit(&mut self, delta: Vec2) {
        self.azimuth -= delta.x * ORBIT_SENSITIVITY;
        self.elevation = (self.elevation - delta.y * ORBIT_SENSITIVITY).clamp(-MAX_ELEVATION, MAX_ELEVATION);
    }

    /// Slide the target in the camera plane by a pointer delta in pixels.
    pub fn pan(&mut self, delta: Vec2) {
        let forward = (self.target - self.position()).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);
        let step = PAN_SENSITIVITY * self.distance;
        self.target += -right * delta.x * step + up * delta.y * step;
    }

    /// Move toward (positive) or away from the target.
    pub fn zoom(&mut self, scroll: f32) {
        self.distance = (self.distance - scroll * ZOOM_SPEED).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Calculate the view matrix for rendering.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Perspective projection for a `width`×`height` viewport.
    pub fn projection_matrix(&self, width: u32, height: u32) -> Mat4 {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}
