use glam::{Mat4, Vec3, Vec4};

use super::AABB;

/// Plane in Hessian normal form: points with `normal.dot(p) + distance >= 0` are in front
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    fn from_vec4(v: Vec4) -> Self {
        let normal = v.truncate();
        let length = normal.length();
        if length > 0.0 {
            Self {
                normal: normal / length,
                distance: v.w / length,
            }
        } else {
            Self {
                normal,
                distance: v.w,
            }
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Camera view volume used for culling
#[derive(Debug, Clone)]
pub struct Frustum {
    /// left, right, bottom, top, near, far
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract planes from a view-projection matrix with a 0..1 depth range
    /// (Gribb-Hartmann).
    pub fn from_matrix(view_proj: &Mat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        Self {
            planes: [
                Plane::from_vec4(r3 + r0),
                Plane::from_vec4(r3 - r0),
                Plane::from_vec4(r3 + r1),
                Plane::from_vec4(r3 - r1),
                Plane::from_vec4(r2),
                Plane::from_vec4(r3 - r2),
            ],
        }
    }

    /// Conservative test: false only when the box is entirely behind one plane
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        if aabb.is_empty() {
            return false;
        }
        self.planes.iter().all(|plane| {
            let positive = Vec3::select(plane.normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            plane.signed_distance(positive) >= 0.0
        })
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.signed_distance(point) >= 0.0)
    }
}
