use glam::{Mat4, Vec3};

use crate::config::CameraConfig;
use crate::math::Frustum;

/// Right-handed perspective camera, Y up
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub up: Vec3,
    target: Vec3,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            up: Vec3::Y,
            target: Vec3::NEG_Z,
        }
    }

    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self::new(
            config.fov_degrees,
            aspect_ratio(width, height),
            config.near,
            config.far,
        );
        camera.position = Vec3::from_array(config.position);
        camera.look_at(Vec3::from_array(config.look_at));
        camera
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize_or(Vec3::X)
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.view_projection())
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_config_uses_render_dimensions() {
        let camera = PerspectiveCamera::from_config(&CameraConfig::default(), 800, 600);
        assert_relative_eq!(camera.aspect, 800.0 / 600.0);
        assert_eq!(camera.fov, 75.0);
        assert_eq!(camera.position, Vec3::new(0.0, 1.0, 5.0));
        assert_eq!(camera.target(), Vec3::ZERO);
    }

    #[test]
    fn test_zero_height_does_not_divide_by_zero() {
        let mut camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);
        camera.set_aspect(800, 0);
        assert!(camera.aspect.is_finite());
    }

    #[test]
    fn test_forward_points_at_target() {
        let mut camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);
        camera.position = Vec3::new(0.0, 0.0, 5.0);
        camera.look_at(Vec3::ZERO);
        assert_relative_eq!(camera.forward().z, -1.0);
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = PerspectiveCamera::from_config(&CameraConfig::default(), 800, 600);
        let clip = camera.view_projection() * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
