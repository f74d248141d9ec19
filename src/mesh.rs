use glam::Vec3;

use crate::math::AABB;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("attribute {attribute} has {found} entries, expected {expected}")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("joint {joint} out of range for a skin of {joint_count} joints")]
    JointOutOfRange { joint: u16, joint_count: usize },
}

/// CPU-side geometry for one drawable primitive.
///
/// Optional attributes are either empty or one entry per position.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub topology: Topology,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
    pub indices: Option<Vec<u32>>,
    /// Linear RGBA multiplied with vertex colours
    pub base_color: [f32; 4],
}

impl MeshData {
    pub fn new(topology: Topology, positions: Vec<[f32; 3]>) -> Self {
        Self {
            topology,
            positions,
            normals: Vec::new(),
            colors: Vec::new(),
            joints: Vec::new(),
            weights: Vec::new(),
            indices: None,
            base_color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn with_colors(mut self, colors: Vec<[f32; 3]>) -> Self {
        self.colors = colors;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn element_count(&self) -> usize {
        self.indices
            .as_ref()
            .map_or(self.positions.len(), |indices| indices.len())
    }

    pub fn is_skinned(&self) -> bool {
        !self.joints.is_empty() && !self.weights.is_empty()
    }

    pub fn bounds(&self) -> AABB {
        AABB::from_points(self.positions.iter().map(|&p| Vec3::from_array(p)))
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        let expected = self.positions.len();
        let optional = [
            ("normals", self.normals.len()),
            ("colors", self.colors.len()),
            ("joints", self.joints.len()),
            ("weights", self.weights.len()),
        ];
        for (attribute, found) in optional {
            if found != 0 && found != expected {
                return Err(MeshError::AttributeLength {
                    attribute,
                    expected,
                    found,
                });
            }
        }

        if let Some(indices) = &self.indices {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= expected) {
                return Err(MeshError::IndexOutOfRange {
                    index,
                    vertex_count: expected,
                });
            }
        }
        Ok(())
    }

    /// Every weighted joint reference must exist in a skin of `joint_count` joints
    pub fn validate_joints(&self, joint_count: usize) -> Result<(), MeshError> {
        for (joints, weights) in self.joints.iter().zip(&self.weights) {
            for (&joint, &weight) in joints.iter().zip(weights) {
                if weight != 0.0 && joint as usize >= joint_count {
                    return Err(MeshError::JointOutOfRange { joint, joint_count });
                }
            }
        }
        Ok(())
    }

    /// Fill in smooth normals from face normals when the source had none
    pub fn ensure_normals(&mut self) {
        if !self.normals.is_empty() || self.topology != Topology::Triangles {
            return;
        }

        let mut accumulated = vec![Vec3::ZERO; self.positions.len()];
        let sequential: Vec<u32>;
        let indices = match &self.indices {
            Some(indices) => indices.as_slice(),
            None => {
                sequential = (0..self.positions.len() as u32).collect();
                &sequential
            }
        };

        for triangle in indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            let pa = Vec3::from_array(self.positions[a]);
            let pb = Vec3::from_array(self.positions[b]);
            let pc = Vec3::from_array(self.positions[c]);
            let face = (pb - pa).cross(pc - pa);
            accumulated[a] += face;
            accumulated[b] += face;
            accumulated[c] += face;
        }

        self.normals = accumulated
            .into_iter()
            .map(|n| n.normalize_or_zero().to_array())
            .collect();
    }
}
