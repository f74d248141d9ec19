//! Loaded model hierarchy, before it is instantiated into the scene graph.

use glam::Mat4;
use std::path::PathBuf;

use crate::math::AABB;
use crate::mesh::MeshData;

/// One skin joint: the model node it follows and its inverse bind matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub node: usize,
    pub inverse_bind: Mat4,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skin {
    pub joints: Vec<Joint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub mesh: MeshData,
    /// Index into `ModelTree::skins`; joint attributes index that skin's joint list
    pub skin: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    pub name: Option<String>,
    pub transform: Mat4,
    pub primitives: Vec<Primitive>,
    pub children: Vec<usize>,
    pub frustum_culled: bool,
}

impl ModelNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            transform: Mat4::IDENTITY,
            primitives: Vec::new(),
            children: Vec::new(),
            frustum_culled: true,
        }
    }
}

/// Flattened node hierarchy; `roots` are the scene's top-level nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTree {
    pub nodes: Vec<ModelNode>,
    pub roots: Vec<usize>,
    pub skins: Vec<Skin>,
}

impl ModelTree {
    /// Depth-first walk from the roots
    /// Each node is visited once; dangling indices are skipped.
    pub fn traverse(&self, mut visit: impl FnMut(usize, &ModelNode)) {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            if std::mem::replace(&mut seen[index], true) {
                continue;
            }
            visit(index, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// First node that breaks the tree shape: an index past the node list, or
    /// a node reached twice through a cycle or a shared child
    pub fn find_invalid_node(&self) -> Option<usize> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = self.roots.clone();
        while let Some(index) = stack.pop() {
            let Some(visited) = seen.get_mut(index) else {
                return Some(index);
            };
            if *visited {
                return Some(index);
            }
            *visited = true;
            stack.extend(&self.nodes[index].children);
        }
        None
    }

    pub fn reachable_nodes(&self) -> usize {
        let mut count = 0;
        self.traverse(|_, _| count += 1);
        count
    }

    pub fn primitive_count(&self) -> usize {
        let mut count = 0;
        self.traverse(|_, node| count += node.primitives.len());
        count
    }

    pub fn primitives_mut(&mut self) -> impl Iterator<Item = &mut Primitive> {
        self.nodes.iter_mut().flat_map(|node| node.primitives.iter_mut())
    }

    /// Bounds of all reachable geometry in model space
    pub fn bounds(&self) -> AABB {
        let mut bounds = AABB::empty();
        let mut seen = vec![false; self.nodes.len()];
        let mut stack: Vec<(usize, Mat4)> = self.roots.iter().map(|&r| (r, Mat4::IDENTITY)).collect();
        while let Some((index, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            if std::mem::replace(&mut seen[index], true) {
                continue;
            }
            let world = parent * node.transform;
            for primitive in &node.primitives {
                bounds = bounds.union(&primitive.mesh.bounds().transformed(&world));
            }
            stack.extend(node.children.iter().map(|&c| (c, world)));
        }
        bounds
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelFormat {
    #[default]
    Gltf,
    /// VRM 0.x (`VRM` extension)
    Vrm0,
    /// VRM 1.0 (`VRMC_vrm` extension)
    Vrm1,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    pub source: PathBuf,
    pub format: ModelFormat,
    pub title: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
}

impl ModelMetadata {
    pub fn display_name(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// Validated result of a model load
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAsset {
    pub scene: ModelTree,
    pub metadata: ModelMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Topology;
    use glam::Vec3;

    fn two_level_tree() -> ModelTree {
        let mut root = ModelNode::new("root");
        root.children = vec![1, 2];
        let mut left = ModelNode::new("left");
        left.transform = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
        left.primitives.push(Primitive {
            mesh: MeshData::new(Topology::Triangles, vec![[0.0; 3], [1.0, 1.0, 1.0]]),
            skin: None,
        });
        let right = ModelNode::new("right");
        ModelTree {
            nodes: vec![root, left, right, ModelNode::new("orphan")],
            roots: vec![0],
            skins: Vec::new(),
        }
    }

    #[test]
    fn test_traverse_is_depth_first_from_roots() {
        let tree = two_level_tree();
        let mut order = Vec::new();
        tree.traverse(|index, _| order.push(index));
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_counts_ignore_unreachable_nodes() {
        let tree = two_level_tree();
        assert_eq!(tree.reachable_nodes(), 3);
        assert_eq!(tree.primitive_count(), 1);
    }

    #[test]
    fn test_cycles_are_detected_and_walked_once() {
        let mut tree = two_level_tree();
        tree.nodes[1].children = vec![0];

        assert_eq!(tree.find_invalid_node(), Some(0));
        assert_eq!(tree.reachable_nodes(), 3);
        assert_eq!(tree.primitive_count(), 1);
        assert_eq!(tree.bounds().max, Vec3::new(3.0, 1.0, 1.0));
    }

    #[test]
    fn test_dangling_child_is_invalid() {
        let mut tree = two_level_tree();
        tree.nodes[2].children = vec![9];

        assert_eq!(tree.find_invalid_node(), Some(9));
        assert_eq!(tree.reachable_nodes(), 3);
    }

    #[test]
    fn test_well_formed_tree_is_valid() {
        assert_eq!(two_level_tree().find_invalid_node(), None);
    }

    #[test]
    fn test_bounds_apply_node_transforms() {
        let bounds = two_level_tree().bounds();
        assert_eq!(bounds.min, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(3.0, 1.0, 1.0));
    }

    #[test]
    fn test_display_name_falls_back_to_source() {
        let metadata = ModelMetadata {
            source: PathBuf::from("models/a.vrm"),
            format: ModelFormat::Vrm0,
            title: None,
            author: None,
            version: None,
        };
        assert_eq!(metadata.display_name(), "models/a.vrm");
    }
}
