mod aabb;
mod color;
mod frustum;

pub use aabb::AABB;
pub use color::Color;
pub use frustum::{Frustum, Plane};
