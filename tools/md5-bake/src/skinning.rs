//! Linear-blend skinning
//!
//! Each vertex position is the bias-weighted sum of its weights' positions transformed into
//! model space by their joint. Biases are used as written (not renormalized).

use glam::Vec3;

use crate::error::{BakeError, Result};
use crate::model::{BakedVertex, JointPose, Mesh};

/// Skin one mesh into `out[vertex_offset..vertex_offset + mesh.vertices.len()]`
///
/// Normals of the written vertices are reset to zero for the normal pass.
pub fn skin(
    mesh: &Mesh,
    joints: &[JointPose],
    out: &mut [BakedVertex],
    vertex_offset: usize,
) -> Result<()> {
    let out_len = out.len();
    let out = vertex_offset
        .checked_add(mesh.vertices.len())
        .and_then(|end| out.get_mut(vertex_offset..end))
        .ok_or(BakeError::OutOfRange {
            what: "output vertex",
            index: vertex_offset.saturating_add(mesh.vertices.len()),
            len: out_len,
        })?;

    for (vertex, baked) in mesh.vertices.iter().zip(out.iter_mut()) {
        let end = vertex.start_weight.saturating_add(vertex.weight_count);
        let weights = mesh
            .weights
            .get(vertex.start_weight..end)
            .ok_or(BakeError::OutOfRange {
                what: "weight",
                index: end,
                len: mesh.weights.len(),
            })?;

        let mut position = Vec3::ZERO;
        for weight in weights {
            let joint = joints.get(weight.joint).ok_or(BakeError::OutOfRange {
                what: "joint",
                index: weight.joint,
                len: joints.len(),
            })?;
            position += (joint.position + joint.rotate(weight.position)) * weight.bias;
        }

        *baked = BakedVertex {
            position,
            normal: Vec3::ZERO,
        };
    }

    Ok(())
}

/// Skin every mesh of a frame into one mesh-major vertex array
pub fn skin_meshes(meshes: &[Mesh], joints: &[JointPose], out: &mut [BakedVertex]) -> Result<()> {
    let mut offset = 0;
    for mesh in meshes {
        skin(mesh, joints, out, offset)?;
        offset += mesh.vertices.len();
    }
    Ok(())
}
