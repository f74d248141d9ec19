//! The scene host: owns the scene graph, camera, controls and the active model.

use futures::FutureExt;
use glam::{Mat4, Vec3};
use std::path::{Path, PathBuf};
use std::task::{Context, Poll};

use crate::camera::PerspectiveCamera;
use crate::config::SceneConfig;
use crate::controls::{OrbitControls, PointerState};
use crate::helpers::{axes_helper, grid_helper};
use crate::loaders::{LoadError, LoadFuture, ModelLoader};
use crate::math::Color;
use crate::mesh::MeshData;
use crate::model::{ModelAsset, ModelMetadata, ModelTree};
use crate::optimize::{prepare_model, OptimizeReport};
use crate::renderer::{DisplayTarget, RenderSurface};
use crate::scene::{DirectionalLight, MeshSlot, NodeId, NodeKind, SceneGraph, SceneNode};

/// Point the orbit controls circle; not configurable
pub const ORBIT_TARGET: Vec3 = Vec3::new(0.0, 1.0, 0.0);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestRejected {
    #[error("a model load is already in progress for {path:?}")]
    Busy { path: PathBuf },
}

/// How a finished load changed the scene
#[derive(Debug)]
pub enum LoadOutcome {
    /// The model is now active under `root`
    Replaced { root: NodeId },
    /// Nothing in the scene changed
    Failed(LoadError),
}

/// The model currently attached to the scene
#[derive(Debug, Clone)]
pub struct ActiveModel {
    pub root: NodeId,
    pub metadata: ModelMetadata,
    pub report: OptimizeReport,
}

struct PendingLoad {
    path: PathBuf,
    future: LoadFuture,
}

pub struct SceneHost<S: RenderSurface> {
    surface: S,
    scene: SceneGraph,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    loader: Box<dyn ModelLoader>,
    light: NodeId,
    grid: NodeId,
    axes: NodeId,
    active: Option<ActiveModel>,
    pending: Option<PendingLoad>,
}

impl<S: RenderSurface> SceneHost<S> {
    /// Build the scene, start loading the configured model and show the
    /// surface in `target`. Fails only if the surface cannot be created.
    pub fn new<T>(
        target: &mut T,
        width: u32,
        height: u32,
        config: &SceneConfig,
        loader: Box<dyn ModelLoader>,
    ) -> anyhow::Result<Self>
    where
        T: DisplayTarget<Surface = S>,
    {
        let mut surface = target.create_surface()?;
        surface.set_size(width, height);
        surface.set_pixel_ratio(target.device_pixel_ratio());

        let mut camera = PerspectiveCamera::from_config(&config.camera, width, height);
        let mut controls = OrbitControls::from_config(ORBIT_TARGET, &config.controls);
        controls.update(&mut camera);

        let mut scene = SceneGraph::new(Color::from_hex(config.background));

        let light_position = Vec3::from_array(config.light.position).normalize_or(Vec3::Y);
        let light = scene.add_to_root(
            SceneNode::new(
                "DirectionalLight",
                NodeKind::DirectionalLight(DirectionalLight {
                    color: Color::from_hex(config.light.color),
                    intensity: config.light.intensity,
                }),
            )
            .with_transform(Mat4::from_translation(light_position)),
        );

        let grid = add_helper(&mut scene, &mut surface, "GridHelper", &grid_helper(&config.grid));
        let axes = add_helper(&mut scene, &mut surface, "AxesHelper", &axes_helper(config.axes_size));

        let mut host = Self {
            surface,
            scene,
            camera,
            controls,
            loader,
            light,
            grid,
            axes,
            active: None,
            pending: None,
        };
        host.start_load(&config.model_path);

        target.attach(&host.surface);
        log::info!("Scene host ready at {}x{}", width, height);
        Ok(host)
    }

    /// Begin loading `path`. Refused while another load is outstanding.
    pub fn request_model(&mut self, path: impl AsRef<Path>) -> Result<(), RequestRejected> {
        if let Some(pending) = &self.pending {
            return Err(RequestRejected::Busy {
                path: pending.path.clone(),
            });
        }
        self.start_load(path.as_ref());
        Ok(())
    }

    fn start_load(&mut self, path: &Path) {
        log::info!("Loading model {:?}", path);
        self.pending = Some(PendingLoad {
            path: path.to_path_buf(),
            future: self.loader.load(path),
        });
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Poll the outstanding load once without blocking and apply its result
    pub fn poll_load(&mut self) -> Option<LoadOutcome> {
        let pending = self.pending.as_mut()?;
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        let result = match pending.future.poll_unpin(&mut cx) {
            Poll::Pending => return None,
            Poll::Ready(result) => result,
        };

        if let Some(finished) = self.pending.take() {
            log::debug!("Load of {:?} finished", finished.path);
        }
        Some(self.complete_load(result))
    }

    /// Apply a finished load. Failures leave the scene untouched.
    pub fn complete_load(&mut self, result: Result<ModelAsset, LoadError>) -> LoadOutcome {
        match result {
            Ok(asset) => LoadOutcome::Replaced {
                root: self.replace_model(asset),
            },
            Err(e) => {
                log::warn!("Model load failed: {}", e);
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Prepare `asset`, dispose the previous model and attach the new one
    pub fn replace_model(&mut self, asset: ModelAsset) -> NodeId {
        let ModelAsset { mut scene, metadata } = asset;
        let report = prepare_model(&mut scene);

        self.dispose_model();

        let root = self.instantiate(&scene, &metadata);
        log::info!(
            "Model {} attached ({} vertices, {} joints removed)",
            metadata.display_name(),
            report.vertices_removed,
            report.joints_removed
        );
        self.active = Some(ActiveModel {
            root,
            metadata,
            report,
        });
        root
    }

    /// Detach the active model and release its meshes
    pub fn dispose_model(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        if let Some(detached) = self.scene.remove(active.root) {
            for handle in detached.mesh_handles() {
                self.surface.release_mesh(handle);
            }
        }
        log::debug!("Disposed model {}", active.metadata.display_name());
    }

    fn instantiate(&mut self, tree: &ModelTree, metadata: &ModelMetadata) -> NodeId {
        let mut group = SceneNode::new(metadata.display_name(), NodeKind::Group);
        group.frustum_culled = false;
        let root = self.scene.add_to_root(group);

        let mut seen = vec![false; tree.nodes.len()];
        let mut stack: Vec<(usize, NodeId)> = tree.roots.iter().rev().map(|&index| (index, root)).collect();
        while let Some((index, parent)) = stack.pop() {
            let Some(model_node) = tree.nodes.get(index) else {
                continue;
            };
            if std::mem::replace(&mut seen[index], true) {
                log::warn!("Node {} reached twice, skipping", index);
                continue;
            }

            let kind = if model_node.primitives.is_empty() {
                NodeKind::Group
            } else {
                NodeKind::Mesh
            };
            let name = model_node
                .name
                .clone()
                .unwrap_or_else(|| format!("node_{}", index));
            let mut node = SceneNode::new(name, kind).with_transform(model_node.transform);
            node.frustum_culled = model_node.frustum_culled;

            for primitive in &model_node.primitives {
                node.meshes.push(MeshSlot {
                    handle: self.surface.upload_mesh(&primitive.mesh),
                    topology: primitive.mesh.topology,
                    bounds: primitive.mesh.bounds(),
                });
            }

            if let Some(id) = self.scene.add(parent, node) {
                stack.extend(model_node.children.iter().rev().map(|&child| (child, id)));
            }
        }
        root
    }

    pub fn render(&mut self) -> anyhow::Result<()> {
        self.surface.render(&self.scene, &self.camera)
    }

    /// Feed pointer input to the orbit controls and advance them one step
    pub fn update_controls(&mut self, pointer: &PointerState) -> bool {
        let viewport_height = self.surface.size().1 as f32;
        self.controls.handle_pointer(pointer, viewport_height, &self.camera);
        self.controls.update(&mut self.camera)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.camera.set_aspect(width, height);
        self.surface.set_size(width, height);
    }

    /// Resize from a device-pixel size, such as a window resize event
    pub fn resize_physical(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.camera.set_aspect(width, height);
        self.surface.set_physical_size(width, height);
    }

    pub fn set_pixel_ratio(&mut self, ratio: f64) {
        self.surface.set_pixel_ratio(ratio);
    }

    /// Drop any pending load and dispose the active model
    pub fn shutdown(&mut self) {
        if let Some(pending) = self.pending.take() {
            log::debug!("Abandoning load of {:?}", pending.path);
        }
        self.dispose_model();
        log::info!("Scene host shut down");
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn active_model(&self) -> Option<&ActiveModel> {
        self.active.as_ref()
    }

    pub fn light_node(&self) -> NodeId {
        self.light
    }

    pub fn grid_node(&self) -> NodeId {
        self.grid
    }

    pub fn axes_node(&self) -> NodeId {
        self.axes
    }
}

fn add_helper<S: RenderSurface>(scene: &mut SceneGraph, surface: &mut S, name: &str, mesh: &MeshData) -> NodeId {
    let slot = MeshSlot {
        handle: surface.upload_mesh(mesh),
        topology: mesh.topology,
        bounds: mesh.bounds(),
    };
    scene.add_to_root(SceneNode::new(name, NodeKind::Helper).with_mesh(slot))
}
