use futures::channel::oneshot;
use futures::FutureExt;
use glam::Mat4;
use gltf::mesh::Mode;
use std::path::Path;

use super::vrm::{json_chunk, read_vrm_info};
use super::{LoadError, LoadFuture, ModelLoader};
use crate::mesh::{MeshData, Topology};
use crate::model::{Joint, ModelAsset, ModelMetadata, ModelNode, ModelTree, Primitive, Skin};

/// Loads glTF / GLB / VRM files on a worker thread and hands the result
/// back through a oneshot channel
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfModelLoader;

impl ModelLoader for GltfModelLoader {
    fn load(&self, path: &Path) -> LoadFuture {
        let path = path.to_path_buf();
        let (sender, receiver) = oneshot::channel();

        let worker_path = path.clone();
        let spawned = std::thread::Builder::new()
            .name("model-loader".to_string())
            .spawn(move || {
                // The receiver is gone if the host dropped the load
                let _ = sender.send(load_model_file(&worker_path));
            });

        if let Err(source) = spawned {
            return futures::future::ready(Err(LoadError::Io { path, source })).boxed();
        }

        receiver
            .map(|result| result.unwrap_or(Err(LoadError::Canceled)))
            .boxed()
    }
}

/// Reads and parses a model file synchronously
pub fn load_model_file(path: impl AsRef<Path>) -> Result<ModelAsset, LoadError> {
    let path = path.as_ref();
    log::info!("Loading model file: {:?}", path);

    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_model(&bytes, path)
}

/// Parses glTF JSON or GLB bytes. External buffers resolve relative to `source`.
pub fn parse_model(bytes: &[u8], source: &Path) -> Result<ModelAsset, LoadError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    let info = read_vrm_info(&json_chunk(bytes)?)?;
    let buffers = gltf::import_buffers(&document, source.parent(), blob)?;

    let scene = build_tree(&document, &buffers)?;

    log::info!(
        "Model {:?} loaded: {:?}, {} nodes, {} primitives, {} skins",
        source,
        info.format,
        scene.reachable_nodes(),
        scene.primitive_count(),
        scene.skins.len()
    );

    Ok(ModelAsset {
        scene,
        metadata: ModelMetadata {
            source: source.to_path_buf(),
            format: info.format,
            title: info.title,
            author: info.author,
            version: info.version,
        },
    })
}

fn build_tree(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Result<ModelTree, LoadError> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(LoadError::MissingScene)?;

    let nodes = document
        .nodes()
        .map(|node| read_node(&node, buffers))
        .collect::<Result<Vec<_>, _>>()?;
    let skins: Vec<Skin> = document.skins().map(|skin| read_skin(&skin, buffers)).collect();

    for node in &nodes {
        for primitive in &node.primitives {
            if let Some(skin) = primitive.skin.and_then(|s| skins.get(s)) {
                primitive
                    .mesh
                    .validate_joints(skin.joints.len())
                    .map_err(|source| LoadError::InvalidMesh {
                        mesh: node.name.clone().unwrap_or_default(),
                        source,
                    })?;
            }
        }
    }

    let tree = ModelTree {
        nodes,
        roots: scene.nodes().map(|node| node.index()).collect(),
        skins,
    };

    if let Some(node) = tree.find_invalid_node() {
        return Err(LoadError::InvalidHierarchy { node });
    }
    if tree.primitive_count() == 0 {
        return Err(LoadError::NoGeometry);
    }
    Ok(tree)
}

fn read_node(node: &gltf::Node, buffers: &[gltf::buffer::Data]) -> Result<ModelNode, LoadError> {
    let primitives = match node.mesh() {
        Some(mesh) => read_mesh(&mesh, node.skin().map(|skin| skin.index()), buffers)?,
        None => Vec::new(),
    };

    Ok(ModelNode {
        name: node.name().map(str::to_owned),
        transform: Mat4::from_cols_array_2d(&node.transform().matrix()),
        primitives,
        children: node.children().map(|child| child.index()).collect(),
        frustum_culled: true,
    })
}

fn read_mesh(
    mesh: &gltf::Mesh,
    skin: Option<usize>,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<Primitive>, LoadError> {
    let name = mesh.name().unwrap_or("unnamed").to_string();
    let mut primitives = Vec::new();

    for primitive in mesh.primitives() {
        let topology = match primitive.mode() {
            Mode::Triangles => Topology::Triangles,
            Mode::Lines => Topology::Lines,
            other => {
                log::debug!("Skipping {:?} primitive in mesh {:?}", other, name);
                continue;
            }
        };

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

        let positions = reader
            .read_positions()
            .ok_or_else(|| LoadError::MissingPositions { mesh: name.clone() })?
            .collect();
        let mut data = MeshData::new(topology, positions);

        if let Some(normals) = reader.read_normals() {
            data.normals = normals.collect();
        }
        if let Some(colors) = reader.read_colors(0) {
            data.colors = colors.into_rgb_f32().collect();
        }
        if let Some(indices) = reader.read_indices() {
            data.indices = Some(indices.into_u32().collect());
        }
        if skin.is_some() {
            if let (Some(joints), Some(weights)) = (reader.read_joints(0), reader.read_weights(0)) {
                data.joints = joints.into_u16().collect();
                data.weights = weights.into_f32().collect();
            }
        }
        data.base_color = primitive.material().pbr_metallic_roughness().base_color_factor();

        data.validate().map_err(|source| LoadError::InvalidMesh {
            mesh: name.clone(),
            source,
        })?;
        data.ensure_normals();

        let skin = skin.filter(|_| data.is_skinned());
        primitives.push(Primitive { mesh: data, skin });
    }

    Ok(primitives)
}

fn read_skin(skin: &gltf::Skin, buffers: &[gltf::buffer::Data]) -> Skin {
    let reader = skin.reader(|buffer| Some(&buffers[buffer.index()]));
    let inverse_binds: Vec<Mat4> = reader
        .read_inverse_bind_matrices()
        .map(|matrices| matrices.map(|m| Mat4::from_cols_array_2d(&m)).collect())
        .unwrap_or_default();

    Skin {
        joints: skin
            .joints()
            .enumerate()
            .map(|(i, node)| Joint {
                node: node.index(),
                inverse_bind: inverse_binds.get(i).copied().unwrap_or(Mat4::IDENTITY),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelFormat;

    fn parse(json: &str) -> Result<ModelAsset, LoadError> {
        parse_model(json.as_bytes(), Path::new("inline.gltf"))
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let err = parse_model(b"definitely not a model", Path::new("x.vrm")).unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn test_document_without_scene_is_rejected() {
        let err = parse(r#"{"asset":{"version":"2.0"}}"#).unwrap_err();
        assert!(matches!(err, LoadError::MissingScene));
    }

    #[test]
    fn test_scene_without_meshes_is_rejected() {
        let err = parse(
            r#"{"asset":{"version":"2.0"},"scenes":[{"nodes":[0]}],"nodes":[{"name":"empty"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::NoGeometry));
    }

    fn triangle_with_nodes(nodes: &str) -> String {
        format!(
            r#"{{"asset":{{"version":"2.0"}},"scenes":[{{"nodes":[0]}}],"nodes":{nodes},
            "meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}}}}]}}],
            "buffers":[{{"byteLength":36,"uri":"data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"}}],
            "bufferViews":[{{"buffer":0,"byteLength":36}}],
            "accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,1,0]}}]}}"#
        )
    }

    #[test]
    fn test_self_cycle_is_rejected() {
        let err = parse(&triangle_with_nodes(r#"[{"mesh":0,"children":[0]}]"#)).unwrap_err();
        assert!(matches!(err, LoadError::InvalidHierarchy { node: 0 }));
    }

    #[test]
    fn test_two_node_cycle_is_rejected() {
        let err = parse(&triangle_with_nodes(r#"[{"mesh":0,"children":[1]},{"children":[0]}]"#)).unwrap_err();
        assert!(matches!(err, LoadError::InvalidHierarchy { .. }));
    }

    #[test]
    fn test_acyclic_triangle_loads() {
        let asset = parse(&triangle_with_nodes(r#"[{"mesh":0}]"#)).unwrap();
        assert_eq!(asset.scene.primitive_count(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_model_file("no/such/model.vrm").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_embedded_vrm_fixture() {
        let bytes = include_bytes!("../../tests/fixtures/avatar.vrm");
        let asset = parse_model(bytes, Path::new("avatar.vrm")).unwrap();

        assert_eq!(asset.metadata.format, ModelFormat::Vrm0);
        assert_eq!(asset.metadata.title.as_deref(), Some("Test Avatar"));
        assert_eq!(asset.scene.roots, vec![0]);
        assert_eq!(asset.scene.primitive_count(), 1);
        assert_eq!(asset.scene.skins[0].joints.len(), 3);
    }
}
