pub mod gltf;
pub mod vrm;

use futures::future::BoxFuture;
use std::path::{Path, PathBuf};

use crate::mesh::MeshError;
use crate::model::ModelAsset;

pub use self::gltf::{load_model_file, parse_model, GltfModelLoader};

/// Future resolving to a validated model
pub type LoadFuture = BoxFuture<'static, Result<ModelAsset, LoadError>>;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse glTF: {0}")]
    Parse(#[from] ::gltf::Error),
    #[error("invalid VRM metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("node {node} breaks the node hierarchy (cycle, shared child or missing node)")]
    InvalidHierarchy { node: usize },
    #[error("model has no scene")]
    MissingScene,
    #[error("model has no renderable geometry")]
    NoGeometry,
    #[error("mesh {mesh:?} primitive has no positions")]
    MissingPositions { mesh: String },
    #[error("mesh {mesh:?}: {source}")]
    InvalidMesh {
        mesh: String,
        #[source]
        source: MeshError,
    },
    #[error("model load was canceled")]
    Canceled,
}

/// Asynchronous fetch-and-parse of one model file
pub trait ModelLoader {
    fn load(&self, path: &Path) -> LoadFuture;
}
