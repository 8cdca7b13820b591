//! In-memory model built by the parsers and filled in by the baking stages

use glam::{Quat, Vec2, Vec3};

/// Position + orientation of a joint
///
/// In the skeleton and in resolved frames these are model-space; in the animation base
/// frame they are relative to the parent joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for JointPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl JointPose {
    /// Rotate a vector by this joint's orientation (`q * (v, 0) * q⁻¹`)
    #[inline]
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        rotate_vector(self.orientation, v)
    }
}

/// Quaternion sandwich product
#[inline]
pub fn rotate_vector(q: Quat, v: Vec3) -> Vec3 {
    let p = Quat::from_xyzw(v.x, v.y, v.z, 0.0);
    (q * p * q.conjugate()).xyz()
}

/// Rebuild a unit quaternion from its x, y, z components
///
/// MD5 stores only x, y, z; w is taken as the non-positive root. A negative radicand
/// (slightly denormalized input) gives w = 0.
#[inline]
pub fn quat_from_xyz(xyz: Vec3) -> Quat {
    let t = 1.0 - xyz.length_squared();
    let w = if t < 0.0 { 0.0 } else { -t.sqrt() };
    Quat::from_xyzw(xyz.x, xyz.y, xyz.z, w)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    /// Always smaller than this joint's own index
    pub parent: Option<usize>,
    pub pose: JointPose,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    pub joints: Vec<Joint>,
}

impl Skeleton {
    /// Bind pose as a resolved frame pose
    pub fn bind_pose(&self) -> Vec<JointPose> {
        self.joints.iter().map(|j| j.pose).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub uv: Vec2,
    pub start_weight: usize,
    pub weight_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weight {
    pub joint: usize,
    pub bias: f32,
    pub position: Vec3,
}

/// Three vertex indices, local to the owning mesh
pub type Triangle = [usize; 3];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Material name, kept as the skin name hint
    pub shader: String,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    pub weights: Vec<Weight>,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Bounds of a point set, `None` if empty
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(
            Self {
                min: first,
                max: first,
            },
            |b, p| Self {
                min: b.min.min(p),
                max: b.max.max(p),
            },
        ))
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// A skinned vertex of one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BakedVertex {
    pub position: Vec3,
    pub normal: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Bounds as written in the animation, `None` for the synthetic bind-pose frame
    pub parsed_bounds: Option<Bounds>,
    /// Resolved model-space joint poses
    pub joints: Vec<JointPose>,
    /// One vertex per model vertex, mesh-major
    pub vertices: Vec<BakedVertex>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub skeleton: Skeleton,
    pub meshes: Vec<Mesh>,
    pub frames: Vec<Frame>,
    pub frame_rate: f32,
}

impl Model {
    /// Total vertex count across all meshes
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles.len()).sum()
    }

    /// Offset of each mesh's first vertex in the flat per-frame vertex array
    pub fn vertex_offsets(&self) -> Vec<usize> {
        self.meshes
            .iter()
            .scan(0, |offset, mesh| {
                let start = *offset;
                *offset += mesh.vertices.len();
                Some(start)
            })
            .collect()
    }
}
