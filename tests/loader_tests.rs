mod common;

use futures::executor::block_on;
use std::time::{Duration, Instant};

use avatar_viewer::loaders::{load_model_file, GltfModelLoader, LoadError, ModelLoader};
use avatar_viewer::mesh::Topology;
use avatar_viewer::model::ModelFormat;
use avatar_viewer::optimize::prepare_model;
use avatar_viewer::{LoadOutcome, SceneConfig, SceneHost};
use common::{fixture, MockTarget};

#[cfg(test)]
mod gltf_loader_tests {
    use super::*;

    #[test]
    fn test_loads_gltf_with_embedded_buffer() {
        let asset = block_on(GltfModelLoader.load(&fixture("triangle.gltf"))).unwrap();

        assert_eq!(asset.metadata.format, ModelFormat::Gltf);
        assert_eq!(asset.scene.primitive_count(), 1);
        let node = &asset.scene.nodes[asset.scene.roots[0]];
        assert_eq!(node.name.as_deref(), Some("Triangle"));
        let mesh = &node.primitives[0].mesh;
        assert_eq!(mesh.topology, Topology::Triangles);
        assert_eq!(mesh.positions.len(), 4);
        // Normals are generated when the file has none
        assert_eq!(mesh.normals.len(), 4);
    }

    #[test]
    fn test_loads_vrm_metadata() {
        let asset = block_on(GltfModelLoader.load(&fixture("avatar.vrm"))).unwrap();

        assert_eq!(asset.metadata.format, ModelFormat::Vrm0);
        assert_eq!(asset.metadata.title.as_deref(), Some("Test Avatar"));
        assert_eq!(asset.metadata.author.as_deref(), Some("avatar-viewer"));
        assert_eq!(asset.metadata.version.as_deref(), Some("1.0"));
        assert_eq!(asset.metadata.display_name(), "Test Avatar");
    }

    #[test]
    fn test_missing_file_resolves_to_io_error() {
        let result = block_on(GltfModelLoader.load(&fixture("does-not-exist.vrm")));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_prepare_strips_unused_vertices_and_joints() {
        let mut asset = load_model_file(fixture("avatar.vrm")).unwrap();

        let report = prepare_model(&mut asset.scene);

        assert_eq!(report.vertices_removed, 1);
        assert_eq!(report.joints_removed, 1);
        let body = asset
            .scene
            .nodes
            .iter()
            .find(|node| node.name.as_deref() == Some("Body"))
            .unwrap();
        let primitive = &body.primitives[0];
        assert_eq!(primitive.mesh.positions.len(), 4);
        assert_eq!(primitive.mesh.element_count(), 6);
        let skin = &asset.scene.skins[primitive.skin.unwrap()];
        assert_eq!(skin.joints.len(), 2);
        assert!(asset.scene.nodes.iter().all(|node| !node.frustum_culled));
    }

    #[test]
    fn test_host_loads_from_disk() {
        let mut config = SceneConfig::default();
        config.model_path = fixture("avatar.vrm");
        let mut target = MockTarget::new(1.0);
        let mut host = SceneHost::new(&mut target, 800, 600, &config, Box::new(GltfModelLoader)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        let outcome = loop {
            if let Some(outcome) = host.poll_load() {
                break outcome;
            }
            assert!(Instant::now() < deadline, "load never finished");
            std::thread::sleep(Duration::from_millis(5));
        };

        assert!(matches!(outcome, LoadOutcome::Replaced { .. }));
        assert_eq!(host.scene().children(host.scene().root()).len(), 4);
    }

    #[test]
    fn test_host_survives_missing_model() {
        let mut config = SceneConfig::default();
        config.model_path = fixture("does-not-exist.vrm");
        let mut target = MockTarget::new(1.0);
        let mut host = SceneHost::new(&mut target, 800, 600, &config, Box::new(GltfModelLoader)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        let outcome = loop {
            if let Some(outcome) = host.poll_load() {
                break outcome;
            }
            assert!(Instant::now() < deadline, "load never finished");
            std::thread::sleep(Duration::from_millis(5));
        };

        assert!(matches!(outcome, LoadOutcome::Failed(LoadError::Io { .. })));
        assert_eq!(host.scene().children(host.scene().root()).len(), 3);
    }
}
