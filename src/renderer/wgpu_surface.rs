use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, Buffer, RenderPipeline, Surface, SurfaceConfiguration, TextureView};

use super::gpu_context::GpuContext;
use super::{MeshHandle, RenderSurface};
use crate::camera::PerspectiveCamera;
use crate::mesh::{MeshData, Topology};
use crate::scene::SceneGraph;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Vertex layout shared by meshes and helper lines
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl GpuVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-frame uniform: camera and light
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniform {
    view_proj: [[f32; 4]; 4],
    light_direction: [f32; 4],
    light_color: [f32; 4],
}

/// Per-draw uniform: world matrix and material
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniform {
    model: [[f32; 4]; 4],
    base_color: [f32; 4],
    params: [f32; 4],
}

struct GpuMesh {
    vertex_buffer: Buffer,
    index_buffer: Option<(Buffer, u32)>,
    vertex_count: u32,
    topology: Topology,
    base_color: [f32; 4],
    object_buffer: Buffer,
    object_bind_group: BindGroup,
}

impl GpuMesh {
    fn destroy(self) {
        self.vertex_buffer.destroy();
        if let Some((buffer, _)) = self.index_buffer {
            buffer.destroy();
        }
        self.object_buffer.destroy();
    }
}

/// Interleave mesh attributes; missing normals are zero, missing colours white
pub fn mesh_vertices(mesh: &MeshData) -> Vec<GpuVertex> {
    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, &position)| GpuVertex {
            position,
            normal: mesh.normals.get(i).copied().unwrap_or([0.0; 3]),
            color: mesh.colors.get(i).copied().unwrap_or([1.0; 3]),
        })
        .collect()
}

/// Physical pixel size for a logical size, never zero
pub fn physical_size(width: u32, height: u32, pixel_ratio: f64) -> (u32, u32) {
    let scale = |v: u32| ((v as f64 * pixel_ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Device size to configure: the exact resize size when known, else the
/// logical size scaled by the pixel ratio
pub fn surface_extent(logical: (u32, u32), pixel_ratio: f64, physical: Option<(u32, u32)>) -> (u32, u32) {
    match physical {
        Some((width, height)) => (width.max(1), height.max(1)),
        None => physical_size(logical.0, logical.1, pixel_ratio),
    }
}

/// wgpu forward renderer for a window surface
pub struct WgpuSurface {
    gpu: GpuContext,
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    depth_view: TextureView,
    triangle_pipeline: RenderPipeline,
    line_pipeline: RenderPipeline,
    frame_buffer: Buffer,
    frame_bind_group: BindGroup,
    object_layout: BindGroupLayout,
    meshes: HashMap<MeshHandle, GpuMesh>,
    next_handle: u64,
    size: (u32, u32),
    pixel_ratio: f64,
    /// Exact device size from the last window resize, if any
    physical: Option<(u32, u32)>,
}

impl WgpuSurface {
    pub fn new(gpu: GpuContext, surface: Surface<'static>, width: u32, height: u32, pixel_ratio: f64) -> Result<Self> {
        let caps = surface.get_capabilities(gpu.adapter());
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("Surface reports no supported formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let (physical_width, physical_height) = physical_size(width, height, pixel_ratio);
        let config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: physical_width,
            height: physical_height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(gpu.device(), &config);

        let device = gpu.device();
        let depth_view = Self::create_depth_view(device, physical_width, physical_height);

        let frame_layout = Self::uniform_layout(device, "Frame Bind Group Layout");
        let object_layout = Self::uniform_layout(device, "Object Bind Group Layout");

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../scene.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let triangle_pipeline = Self::create_pipeline(
            device,
            &pipeline_layout,
            &shader,
            format,
            wgpu::PrimitiveTopology::TriangleList,
        );
        let line_pipeline = Self::create_pipeline(
            device,
            &pipeline_layout,
            &shader,
            format,
            wgpu::PrimitiveTopology::LineList,
        );

        log::info!(
            "Surface configured: {}x{} logical, {}x{} physical, {:?}",
            width,
            height,
            physical_width,
            physical_height,
            format
        );

        Ok(Self {
            gpu,
            surface,
            config,
            depth_view,
            triangle_pipeline,
            line_pipeline,
            frame_buffer,
            frame_bind_group,
            object_layout,
            meshes: HashMap::new(),
            next_handle: 0,
            size: (width, height),
            pixel_ratio,
            physical: None,
        })
    }

    fn reconfigure(&mut self) {
        let (width, height) = surface_extent(self.size, self.pixel_ratio, self.physical);
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(self.gpu.device(), &self.config);
        self.depth_view = Self::create_depth_view(self.gpu.device(), width, height);
    }

    fn uniform_layout(device: &wgpu::Device, label: &str) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        })
    }

    fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Depth Texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        topology: wgpu::PrimitiveTopology,
    ) -> RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(match topology {
                wgpu::PrimitiveTopology::LineList => "Line Pipeline",
                _ => "Triangle Pipeline",
            }),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn frame_uniform(scene: &SceneGraph, camera: &PerspectiveCamera) -> FrameUniform {
        let (direction, color) = match scene.light() {
            Some(light) => (light.direction.extend(0.0), light.color.to_array()),
            None => (glam::Vec4::Y, [0.0; 3]),
        };
        let intensity = scene.light().map_or(0.0, |light| light.intensity);

        FrameUniform {
            view_proj: camera.view_projection().to_cols_array_2d(),
            light_direction: direction.to_array(),
            light_color: [color[0], color[1], color[2], intensity],
        }
    }
}

impl RenderSurface for WgpuSurface {
    fn set_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        self.physical = None;
        self.reconfigure();
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        if ratio <= 0.0 || ratio == self.pixel_ratio {
            return;
        }
        self.pixel_ratio = ratio;
        self.physical = None;
        self.reconfigure();
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn set_physical_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let ratio = self.pixel_ratio.max(f64::EPSILON);
        self.size = (
            ((width as f64 / ratio).round() as u32).max(1),
            ((height as f64 / ratio).round() as u32).max(1),
        );
        self.physical = Some((width, height));
        self.reconfigure();
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle {
        let device = self.gpu.device();
        let vertices = mesh_vertices(mesh);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = mesh.indices.as_ref().map(|indices| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (buffer, indices.len() as u32)
        });

        let object_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object Uniform Buffer"),
            size: std::mem::size_of::<ObjectUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let object_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object Bind Group"),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: object_buffer.as_entire_binding(),
            }],
        });

        let handle = MeshHandle(self.next_handle);
        self.next_handle += 1;
        self.meshes.insert(
            handle,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                vertex_count: vertices.len() as u32,
                topology: mesh.topology,
                base_color: mesh.base_color,
                object_buffer,
                object_bind_group,
            },
        );
        handle
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        if let Some(mesh) = self.meshes.remove(&handle) {
            mesh.destroy();
        }
    }

    fn render(&mut self, scene: &SceneGraph, camera: &PerspectiveCamera) -> Result<()> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.reconfigure();
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to acquire surface texture"),
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let queue = self.gpu.queue();
        queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&Self::frame_uniform(scene, camera)),
        );

        let draws = scene.collect_draws(&camera.frustum());
        for draw in &draws {
            if let Some(mesh) = self.meshes.get(&draw.handle) {
                let lit = if mesh.topology == Topology::Triangles { 1.0 } else { 0.0 };
                let object = ObjectUniform {
                    model: draw.world.to_cols_array_2d(),
                    base_color: mesh.base_color,
                    params: [lit, 0.0, 0.0, 0.0],
                };
                queue.write_buffer(&mesh.object_buffer, 0, bytemuck::bytes_of(&object));
            }
        }

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Render Encoder"),
            });

        {
            let background = scene.background;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: background.r as f64,
                            g: background.g as f64,
                            b: background.b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for draw in &draws {
                let Some(mesh) = self.meshes.get(&draw.handle) else {
                    continue;
                };
                if mesh.vertex_count == 0 {
                    continue;
                }

                let pipeline = match mesh.topology {
                    Topology::Triangles => &self.triangle_pipeline,
                    Topology::Lines => &self.line_pipeline,
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(1, &mesh.object_bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));

                match &mesh.index_buffer {
                    Some((buffer, count)) if *count > 0 => {
                        render_pass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..*count, 0, 0..1);
                    }
                    Some(_) => {}
                    None => render_pass.draw(0..mesh.vertex_count, 0..1),
                }
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
