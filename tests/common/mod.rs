#![allow(dead_code)]

use futures::channel::oneshot;
use futures::FutureExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use avatar_viewer::camera::PerspectiveCamera;
use avatar_viewer::loaders::{load_model_file, LoadError, LoadFuture, ModelLoader};
use avatar_viewer::mesh::MeshData;
use avatar_viewer::model::ModelAsset;
use avatar_viewer::renderer::{DisplayTarget, MeshHandle, RenderSurface};
use avatar_viewer::scene::SceneGraph;

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

pub fn avatar() -> ModelAsset {
    load_model_file(fixture("avatar.vrm")).expect("avatar fixture loads")
}

/// Records what the host does to its surface
#[derive(Debug, Default)]
pub struct MockSurface {
    pub size: (u32, u32),
    pub pixel_ratio: f64,
    pub live: HashSet<MeshHandle>,
    pub uploads: usize,
    pub released: Vec<MeshHandle>,
    pub renders: usize,
    next: u64,
}

impl RenderSurface for MockSurface {
    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn upload_mesh(&mut self, _mesh: &MeshData) -> MeshHandle {
        let handle = MeshHandle(self.next);
        self.next += 1;
        self.uploads += 1;
        self.live.insert(handle);
        handle
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        self.live.remove(&handle);
        self.released.push(handle);
    }

    fn render(&mut self, _scene: &SceneGraph, _camera: &PerspectiveCamera) -> anyhow::Result<()> {
        self.renders += 1;
        Ok(())
    }
}

pub struct MockTarget {
    pub pixel_ratio: f64,
    pub attached: Option<(u32, u32)>,
    pub fail: bool,
}

impl MockTarget {
    pub fn new(pixel_ratio: f64) -> Self {
        Self {
            pixel_ratio,
            attached: None,
            fail: false,
        }
    }
}

impl DisplayTarget for MockTarget {
    type Surface = MockSurface;

    fn device_pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn create_surface(&mut self) -> anyhow::Result<MockSurface> {
        if self.fail {
            anyhow::bail!("no surface available");
        }
        Ok(MockSurface::default())
    }

    fn attach(&mut self, surface: &MockSurface) {
        self.attached = Some(surface.size());
    }
}

type Sender = oneshot::Sender<Result<ModelAsset, LoadError>>;

/// Loader whose results are delivered by the test
#[derive(Clone, Default)]
pub struct ManualLoader {
    senders: Arc<Mutex<Vec<Sender>>>,
    pub requested: Arc<Mutex<Vec<PathBuf>>>,
}

impl ManualLoader {
    /// Resolve the oldest outstanding load
    pub fn resolve(&self, result: Result<ModelAsset, LoadError>) {
        let sender = self.senders.lock().unwrap().remove(0);
        sender.send(result).ok().expect("host still waiting");
    }

    /// Drop the oldest outstanding load without an answer
    pub fn abandon(&self) {
        self.senders.lock().unwrap().remove(0);
    }

    pub fn requests(&self) -> Vec<PathBuf> {
        self.requested.lock().unwrap().clone()
    }
}

impl ModelLoader for ManualLoader {
    fn load(&self, path: &Path) -> LoadFuture {
        let (sender, receiver) = oneshot::channel();
        self.senders.lock().unwrap().push(sender);
        self.requested.lock().unwrap().push(path.to_path_buf());
        receiver
            .map(|result| result.unwrap_or(Err(LoadError::Canceled)))
            .boxed()
    }
}
