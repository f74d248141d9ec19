//! Post-processing applied to a model before it enters the scene graph.

use std::collections::HashMap;

use crate::mesh::MeshData;
use crate::model::{ModelTree, Primitive, Skin};

/// What a preparation pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeReport {
    pub vertices_removed: usize,
    pub joints_removed: usize,
}

/// Strip unused vertices and joints, then force every node to render
pub fn prepare_model(tree: &mut ModelTree) -> OptimizeReport {
    let vertices_removed = remove_unnecessary_vertices(tree);
    let joints_removed = remove_unnecessary_joints(tree);
    disable_frustum_culling(tree);
    OptimizeReport {
        vertices_removed,
        joints_removed,
    }
}

/// Compact each indexed primitive down to the vertices its indices reference.
/// Returns the number of vertices dropped.
pub fn remove_unnecessary_vertices(tree: &mut ModelTree) -> usize {
    tree.primitives_mut()
        .map(|primitive| compact_vertices(&mut primitive.mesh))
        .sum()
}

fn compact_vertices(mesh: &mut MeshData) -> usize {
    let Some(indices) = mesh.indices.as_mut() else {
        return 0;
    };

    // old index -> new index, assigned in first-reference order
    let mut remap: HashMap<u32, u32> = HashMap::with_capacity(indices.len());
    let mut order: Vec<usize> = Vec::with_capacity(mesh.positions.len());
    for index in indices.iter_mut() {
        let next = remap.len() as u32;
        let new_index = *remap.entry(*index).or_insert_with(|| {
            order.push(*index as usize);
            next
        });
        *index = new_index;
    }

    let before = mesh.positions.len();
    mesh.positions = gather(&mesh.positions, &order);
    mesh.normals = gather(&mesh.normals, &order);
    mesh.colors = gather(&mesh.colors, &order);
    mesh.joints = gather(&mesh.joints, &order);
    mesh.weights = gather(&mesh.weights, &order);
    before - mesh.positions.len()
}

fn gather<T: Copy>(values: &[T], order: &[usize]) -> Vec<T> {
    if values.is_empty() {
        return Vec::new();
    }
    order.iter().map(|&i| values[i]).collect()
}

/// Give each skinned primitive its own skin holding only the joints it is
/// weighted to. Returns the number of joint references dropped.
pub fn remove_unnecessary_joints(tree: &mut ModelTree) -> usize {
    let old_skins = std::mem::take(&mut tree.skins);
    let mut skins = Vec::new();
    let mut removed = 0;

    for primitive in tree.primitives_mut() {
        let Some(skin_index) = primitive.skin else {
            continue;
        };
        let Some(skin) = old_skins.get(skin_index) else {
            log::warn!("Primitive references missing skin {}", skin_index);
            primitive.skin = None;
            continue;
        };

        let compacted = compact_joints(primitive, skin);
        removed += skin.joints.len() - compacted.joints.len();
        primitive.skin = Some(skins.len());
        skins.push(compacted);
    }

    tree.skins = skins;
    removed
}

fn compact_joints(primitive: &mut Primitive, skin: &Skin) -> Skin {
    let mesh = &mut primitive.mesh;

    let mut used = vec![false; skin.joints.len()];
    for (joints, weights) in mesh.joints.iter().zip(&mesh.weights) {
        for (&joint, &weight) in joints.iter().zip(weights) {
            if weight != 0.0 {
                if let Some(slot) = used.get_mut(joint as usize) {
                    *slot = true;
                }
            }
        }
    }
    if !used.iter().any(|&u| u) && !used.is_empty() {
        used[0] = true;
    }

    let mut remap = vec![0u16; skin.joints.len()];
    let mut joints = Vec::new();
    for (old, _) in used.iter().enumerate().filter(|&(_, &u)| u) {
        remap[old] = joints.len() as u16;
        joints.push(skin.joints[old].clone());
    }

    for (slots, weights) in mesh.joints.iter_mut().zip(&mesh.weights) {
        for (joint, &weight) in slots.iter_mut().zip(weights) {
            *joint = if weight != 0.0 {
                remap.get(*joint as usize).copied().unwrap_or(0)
            } else {
                0
            };
        }
    }

    Skin { joints }
}

/// Mark every node as always drawn, even when outside the view volume
pub fn disable_frustum_culling(tree: &mut ModelTree) {
    for node in &mut tree.nodes {
        node.frustum_culled = false;
    }
}
