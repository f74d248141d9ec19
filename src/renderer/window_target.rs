use anyhow::{anyhow, Result};
use std::sync::Arc;
use wgpu::Surface;
use winit::window::Window;

use super::gpu_context::GpuContext;
use super::wgpu_surface::WgpuSurface;
use super::DisplayTarget;

/// A winit window with the GPU device bound to it
pub struct WindowTarget {
    window: Arc<Window>,
    gpu: GpuContext,
    surface: Option<Surface<'static>>,
}

impl WindowTarget {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let (gpu, surface) = GpuContext::new_with_surface(window.clone()).await?;
        Ok(Self {
            window,
            gpu,
            surface: Some(surface),
        })
    }
}

impl DisplayTarget for WindowTarget {
    type Surface = WgpuSurface;

    fn device_pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }

    fn create_surface(&mut self) -> Result<WgpuSurface> {
        let surface = self
            .surface
            .take()
            .ok_or_else(|| anyhow!("Window surface was already created"))?;
        let ratio = self.device_pixel_ratio();
        let size = self.window.inner_size().to_logical::<u32>(ratio);
        WgpuSurface::new(self.gpu.clone(), surface, size.width.max(1), size.height.max(1), ratio)
    }

    fn attach(&mut self, _surface: &WgpuSurface) {
        self.window.set_visible(true);
        self.window.request_redraw();
    }
}
