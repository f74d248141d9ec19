use glam::Vec3;
use std::f32::consts::PI;

use crate::camera::PerspectiveCamera;
use crate::config::ControlsConfig;

const EPS: f32 = 1e-6;

/// Pointer movement accumulated since the last frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    /// Drag delta with the rotate button held, in pixels
    pub rotate: (f32, f32),
    /// Drag delta with the pan button held, in pixels
    pub pan: (f32, f32),
    /// Wheel lines, positive away from the user
    pub scroll: f32,
}

impl PointerState {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Spherical coordinates around the orbit target (radius, polar, azimuth)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/// Orbit, dolly and pan a camera around a target point
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub screen_space_panning: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    spherical_delta: Spherical,
    pan_offset: Vec3,
    scale: f32,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self::from_config(target, &ControlsConfig::default())
    }

    pub fn from_config(target: Vec3, config: &ControlsConfig) -> Self {
        Self {
            target,
            screen_space_panning: config.screen_space_panning,
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor,
            rotate_speed: config.rotate_speed,
            pan_speed: config.pan_speed,
            zoom_speed: config.zoom_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance.unwrap_or(f32::INFINITY),
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            spherical_delta: Spherical::default(),
            pan_offset: Vec3::ZERO,
            scale: 1.0,
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// Move closer by `scale` (> 1 approaches the target)
    pub fn dolly_in(&mut self, scale: f32) {
        self.scale /= scale;
    }

    pub fn dolly_out(&mut self, scale: f32) {
        self.scale *= scale;
    }

    /// Pan by a pixel delta on a viewport of the given height
    pub fn pan(&mut self, delta_x: f32, delta_y: f32, viewport_height: f32, camera: &PerspectiveCamera) {
        let height = viewport_height.max(1.0);
        let offset = camera.position - self.target;
        let target_distance = offset.length() * (camera.fov.to_radians() * 0.5).tan();

        let right = camera.right();
        let left_distance = 2.0 * delta_x * target_distance / height;
        self.pan_offset += right * -left_distance;

        let up_distance = 2.0 * delta_y * target_distance / height;
        let up = if self.screen_space_panning {
            right.cross(camera.forward())
        } else {
            camera.up.cross(right)
        };
        self.pan_offset += up * up_distance;
    }

    /// Translate one frame of pointer input into pending orbit deltas
    pub fn handle_pointer(&mut self, pointer: &PointerState, viewport_height: f32, camera: &PerspectiveCamera) {
        let height = viewport_height.max(1.0);
        let (rx, ry) = pointer.rotate;
        if rx != 0.0 || ry != 0.0 {
            self.rotate_left(2.0 * PI * rx * self.rotate_speed / height);
            self.rotate_up(2.0 * PI * ry * self.rotate_speed / height);
        }

        let (px, py) = pointer.pan;
        if px != 0.0 || py != 0.0 {
            self.pan(px * self.pan_speed, py * self.pan_speed, height, camera);
        }

        if pointer.scroll != 0.0 {
            let zoom_scale = 0.95f32.powf(self.zoom_speed);
            let steps = pointer.scroll.abs();
            if pointer.scroll > 0.0 {
                self.dolly_in(zoom_scale.powf(-steps));
            } else {
                self.dolly_out(zoom_scale.powf(-steps));
            }
        }
    }

    /// Apply pending deltas to the camera and aim it at the target.
    /// Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_offset(offset);

        if self.enable_damping {
            spherical.theta += self.spherical_delta.theta * self.damping_factor;
            spherical.phi += self.spherical_delta.phi * self.damping_factor;
        } else {
            spherical.theta += self.spherical_delta.theta;
            spherical.phi += self.spherical_delta.phi;
        }

        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(EPS, PI - EPS);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        if self.enable_damping {
            self.target += self.pan_offset * self.damping_factor;
        } else {
            self.target += self.pan_offset;
        }

        let previous = camera.position;
        camera.position = self.target + spherical.to_offset();
        camera.look_at(self.target);

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= decay;
            self.spherical_delta.phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        previous.distance_squared(camera.position) > EPS
    }
}
