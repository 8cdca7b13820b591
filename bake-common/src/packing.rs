//! Vertex data packing utilities
//!
//! Provides functions to convert skinned f32 vertex data to the baked model's packed forms:
//! - f32x3 position → u16x3 relative to a per-frame bounding box
//! - f32x3 normal → u8 index into a fixed table of canonical directions
//!
//! Used by both `md5-bake` (asset pipeline) and readers of baked models.

use glam::Vec3;
use hashbrown::HashMap;
use std::sync::OnceLock;

// ============================================================================
// Position Quantization
// ============================================================================

/// Largest quantized coordinate value (u16::MAX as f32)
pub const QUANT_MAX: f32 = 65535.0;

/// Smallest per-axis quantization step.
///
/// Axes with zero extent (flat geometry) would otherwise get a zero scale. With the clamp every
/// vertex on such an axis quantizes to 0 and dequantizes back to `translate` exactly.
pub const MIN_QUANT_SCALE: f32 = 1.0e-6;

/// Compute `(translate, scale)` for a bounding box
///
/// `translate = min`, `scale = (max - min) / 65535` per axis, clamped to [`MIN_QUANT_SCALE`].
#[inline]
pub fn quant_params(min: Vec3, max: Vec3) -> (Vec3, Vec3) {
    let scale = ((max - min) / QUANT_MAX).max(Vec3::splat(MIN_QUANT_SCALE));
    (min, scale)
}

/// Quantize a position to u16x3 relative to `translate`/`scale`
///
/// Values are rounded to the nearest step and clamped to `0..=65535`.
#[inline]
pub fn quantize_position(pos: Vec3, translate: Vec3, scale: Vec3) -> [u16; 3] {
    let q = ((pos - translate) / scale)
        .round()
        .clamp(Vec3::ZERO, Vec3::splat(QUANT_MAX));
    [q.x as u16, q.y as u16, q.z as u16]
}

/// Inverse of [`quantize_position`]
#[inline]
pub fn dequantize_position(q: [u16; 3], translate: Vec3, scale: Vec3) -> Vec3 {
    translate + Vec3::new(q[0] as f32, q[1] as f32, q[2] as f32) * scale
}

// ============================================================================
// Normal Table
// ============================================================================

/// Number of canonical normal directions (icosahedron subdivided twice)
pub const NUM_VERTEX_NORMALS: usize = 162;

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

static NORMAL_TABLE: OnceLock<Vec<Vec3>> = OnceLock::new();

/// The fixed table of canonical unit directions used for normal compression
///
/// Generated once, in a deterministic order: the 12 icosahedron corners first, then the
/// midpoints added by each subdivision pass.
pub fn normal_table() -> &'static [Vec3] {
    NORMAL_TABLE.get_or_init(build_normal_table)
}

fn build_normal_table() -> Vec<Vec3> {
    let t = (1.0 + 5.0f32.sqrt()) / 2.0;
    let corners = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ];

    let mut vertices: Vec<Vec3> = corners
        .iter()
        .map(|c| Vec3::from_array(*c).normalize())
        .collect();
    let mut faces = ICOSAHEDRON_FACES.to_vec();

    for _ in 0..2 {
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut subdivided = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = midpoint(&mut vertices, &mut midpoints, a, b);
            let bc = midpoint(&mut vertices, &mut midpoints, b, c);
            let ca = midpoint(&mut vertices, &mut midpoints, c, a);
            subdivided.extend([[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        faces = subdivided;
    }

    debug_assert_eq!(vertices.len(), NUM_VERTEX_NORMALS);
    vertices
}

fn midpoint(
    vertices: &mut Vec<Vec3>,
    cache: &mut HashMap<(usize, usize), usize>,
    a: usize,
    b: usize,
) -> usize {
    let key = (a.min(b), a.max(b));
    *cache.entry(key).or_insert_with(|| {
        let mid = ((vertices[a] + vertices[b]) * 0.5).normalize();
        vertices.push(mid);
        vertices.len() - 1
    })
}

/// Compress a normal to the index of the nearest canonical direction (largest dot product)
///
/// Lossy. Ties resolve to the lowest index, so a zero normal encodes as 0.
pub fn encode_normal_index(normal: Vec3) -> u8 {
    let mut best = 0usize;
    let mut best_dot = f32::NEG_INFINITY;
    for (i, dir) in normal_table().iter().enumerate() {
        let dot = dir.dot(normal);
        if dot > best_dot {
            best_dot = dot;
            best = i;
        }
    }
    best as u8
}

/// Look up a canonical direction by index (zero vector for out-of-range indices)
#[inline]
pub fn decode_normal_index(index: u8) -> Vec3 {
    normal_table()
        .get(index as usize)
        .copied()
        .unwrap_or(Vec3::ZERO)
}
