pub mod gpu_context;
pub mod wgpu_surface;
pub mod window_target;

pub use gpu_context::GpuContext;
pub use wgpu_surface::WgpuSurface;
pub use window_target::WindowTarget;

use crate::camera::PerspectiveCamera;
use crate::mesh::MeshData;
use crate::scene::SceneGraph;

/// Opaque id of a mesh uploaded to a render surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u64);

/// Something that can draw a scene graph and owns the GPU copies of its meshes
pub trait RenderSurface {
    /// Set the size in logical pixels
    fn set_size(&mut self, width: u32, height: u32);

    /// Logical size
    fn size(&self) -> (u32, u32);

    fn set_pixel_ratio(&mut self, ratio: f64);

    /// Size the backing store to exactly `width` x `height` device pixels,
    /// e.g. from a window resize event
    fn set_physical_size(&mut self, width: u32, height: u32) {
        let ratio = self.pixel_ratio().max(f64::EPSILON);
        self.set_size(
            ((width as f64 / ratio).round() as u32).max(1),
            ((height as f64 / ratio).round() as u32).max(1),
        );
    }

    fn pixel_ratio(&self) -> f64;

    /// Upload geometry; the handle stays valid until released
    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle;

    /// Free the GPU resources behind `handle`. Unknown handles are ignored.
    fn release_mesh(&mut self, handle: MeshHandle);

    /// Draw one frame of `scene` as seen from `camera`
    fn render(&mut self, scene: &SceneGraph, camera: &PerspectiveCamera) -> anyhow::Result<()>;
}

/// Where a render surface is created and shown
pub trait DisplayTarget {
    type Surface: RenderSurface;

    fn device_pixel_ratio(&self) -> f64;

    fn create_surface(&mut self) -> anyhow::Result<Self::Surface>;

    /// Make the surface visible in this target
    fn attach(&mut self, surface: &Self::Surface);
}
