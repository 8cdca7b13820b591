//! Per-vertex normals from face normals
//!
//! Every frame's vertex normals are the normalized sum of the unit face normals of the
//! triangles touching the vertex, then negated. The negation is part of the output
//! convention and consumers rely on it.

use glam::Vec3;

use crate::model::{BakedVertex, Mesh, Model};

/// Unit normal of a triangle, zero for a degenerate one
#[inline]
pub fn face_normal(p0: Vec3, p1: Vec3, p2: Vec3) -> Vec3 {
    (p1 - p0).cross(p2 - p0).normalize_or_zero()
}

/// Compute the normals of one frame's mesh-major vertex array in place
pub fn frame_normals(meshes: &[Mesh], vertices: &mut [BakedVertex]) {
    for v in vertices.iter_mut() {
        v.normal = Vec3::ZERO;
    }

    let mut offset = 0;
    for mesh in meshes {
        for tri in &mesh.triangles {
            let [a, b, c] = tri.map(|i| offset + i);
            let n = face_normal(vertices[a].position, vertices[b].position, vertices[c].position);
            vertices[a].normal += n;
            vertices[b].normal += n;
            vertices[c].normal += n;
        }
        offset += mesh.vertices.len();
    }

    for v in vertices.iter_mut() {
        v.normal = -v.normal.normalize_or_zero();
    }
}

/// Compute normals for every frame of a skinned model
pub fn compute_normals(model: &mut Model) {
    let Model { meshes, frames, .. } = model;
    for frame in frames.iter_mut() {
        frame_normals(meshes, &mut frame.vertices);
    }
}
