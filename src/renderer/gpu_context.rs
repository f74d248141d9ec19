use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use wgpu::{Adapter, Device, DeviceDescriptor, Features, Instance, Limits, Queue, Surface};
use winit::window::Window;

/// Device and queue shared by the surface and its mesh uploads.
///
/// Cloning is cheap (Arc).
#[derive(Clone)]
pub struct GpuContext {
    adapter: Arc<Adapter>,
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl GpuContext {
    /// Create a surface for `window` and a device able to present to it
    pub async fn new_with_surface(window: Arc<Window>) -> Result<(Self, Surface<'static>)> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("Failed to create window surface")?;

        let adapter = Self::request_adapter(&instance, &surface).await?;
        log::info!("Using adapter: {:?}", adapter.get_info().name);
        let (device, queue) = Self::request_device(&adapter).await?;

        Ok((
            Self {
                adapter: Arc::new(adapter),
                device: Arc::new(device),
                queue: Arc::new(queue),
            },
            surface,
        ))
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Request adapter with surface compatibility
    async fn request_adapter(instance: &Instance, surface: &Surface<'_>) -> Result<Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("Failed to find appropriate adapter: {:?}", e))
    }

    /// Request device and queue
    async fn request_device(adapter: &Adapter) -> Result<(Device, Queue)> {
        adapter
            .request_device(&DeviceDescriptor {
                label: Some("Scene Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| anyhow!("Failed to create device: {:?}", e))
    }
}
