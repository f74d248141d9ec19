//! Scene graph: an arena of nodes under a single root.

use glam::{Mat4, Vec3};
use slotmap::{new_key_type, SlotMap};

use crate::math::{Color, Frustum, AABB};
use crate::mesh::Topology;
use crate::renderer::MeshHandle;

new_key_type! {
    pub struct NodeId;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh,
    /// Shines from the node's world position toward the origin
    DirectionalLight(DirectionalLight),
    Helper,
}

/// GPU mesh attached to a node, with its model-space bounds for culling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshSlot {
    pub handle: MeshHandle,
    pub topology: Topology,
    pub bounds: AABB,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Mat4,
    pub meshes: Vec<MeshSlot>,
    pub visible: bool,
    pub frustum_culled: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: Mat4::IDENTITY,
            meshes: Vec::new(),
            visible: true,
            frustum_culled: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh(mut self, slot: MeshSlot) -> Self {
        self.meshes.push(slot);
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Nodes removed from the graph; their meshes still hold GPU resources
#[derive(Debug, Default)]
pub struct DetachedSubtree {
    pub nodes: Vec<SceneNode>,
}

impl DetachedSubtree {
    pub fn mesh_handles(&self) -> impl Iterator<Item = MeshHandle> + '_ {
        self.nodes
            .iter()
            .flat_map(|node| node.meshes.iter().map(|slot| slot.handle))
    }
}

/// One mesh to draw this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub handle: MeshHandle,
    pub topology: Topology,
    pub world: Mat4,
}

/// Light as seen by the shader: unit vector toward the light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightInfo {
    pub direction: Vec3,
    pub color: Color,
    pub intensity: f32,
}

pub struct SceneGraph {
    nodes: SlotMap<NodeId, SceneNode>,
    root: NodeId,
    pub background: Color,
}

impl SceneGraph {
    pub fn new(background: Color) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::new("Scene", NodeKind::Group));
        Self {
            nodes,
            root,
            background,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |node| node.children.as_slice())
    }

    /// Insert `node` as the last child of `parent`; None if the parent is gone
    pub fn add(&mut self, parent: NodeId, mut node: SceneNode) -> Option<NodeId> {
        if !self.nodes.contains_key(parent) {
            return None;
        }
        node.parent = Some(parent);
        node.children.clear();
        let id = self.nodes.insert(node);
        self.nodes[parent].children.push(id);
        Some(id)
    }

    pub fn add_to_root(&mut self, node: SceneNode) -> NodeId {
        let id = self.nodes.insert(SceneNode {
            parent: Some(self.root),
            children: Vec::new(),
            ..node
        });
        self.nodes[self.root].children.push(id);
        id
    }

    /// Detach `id` and everything below it. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Option<DetachedSubtree> {
        if id == self.root || !self.nodes.contains_key(id) {
            return None;
        }

        if let Some(parent) = self.nodes[id].parent {
            if let Some(parent) = self.nodes.get_mut(parent) {
                parent.children.retain(|&child| child != id);
            }
        }

        let mut detached = DetachedSubtree::default();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children.iter().copied());
                detached.nodes.push(node);
            }
        }
        Some(detached)
    }

    /// Depth-first visit of `id` and its descendants
    pub fn traverse(&self, id: NodeId, mut visit: impl FnMut(NodeId, &SceneNode)) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                visit(current, node);
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    pub fn subtree_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.traverse(id, |current, _| ids.push(current));
        ids
    }

    pub fn world_transform(&self, id: NodeId) -> Mat4 {
        let mut transform = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.nodes.get(c)) {
            transform = node.transform * transform;
            current = node.parent;
        }
        transform
    }

    /// First directional light in the graph
    pub fn light(&self) -> Option<LightInfo> {
        let mut found = None;
        self.traverse(self.root, |id, node| {
            if found.is_some() {
                return;
            }
            if let NodeKind::DirectionalLight(light) = node.kind {
                let position = self.world_transform(id).transform_point3(Vec3::ZERO);
                found = Some(LightInfo {
                    direction: position.normalize_or(Vec3::Y),
                    color: light.color,
                    intensity: light.intensity,
                });
            }
        });
        found
    }

    /// Visible meshes in draw order. Nodes that allow culling are skipped
    /// when their world bounds fall outside `frustum`.
    pub fn collect_draws(&self, frustum: &Frustum) -> Vec<DrawItem> {
        let mut draws = Vec::new();
        let mut stack = vec![(self.root, Mat4::IDENTITY)];
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            let world = parent_world * node.transform;

            for slot in &node.meshes {
                if node.frustum_culled && !frustum.intersects_aabb(&slot.bounds.transformed(&world)) {
                    continue;
                }
                draws.push(DrawItem {
                    handle: slot.handle,
                    topology: slot.topology,
                    world,
                });
            }
            stack.extend(node.children.iter().rev().map(|&child| (child, world)));
        }
        draws
    }
}
