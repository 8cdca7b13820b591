//! Programmatic MD5 generation for integration tests.
//!
//! Generates a "tube" character:
//! - A chain of joints stacked along +Z (each parented to the previous one)
//! - A body mesh with one vertex ring per joint, inner rings blended between two joints
//! - A cap mesh closing the top ring with a fan
//! - An animation where the root slides along +Y and every other joint bends about X
//!
//! Alongside the text it computes reference joint poses and skinned positions with plain
//! glam math, so tests can check the baker against an independent result.

#![allow(dead_code)]

use glam::{Quat, Vec3};
use std::fmt::Write;

/// Distance between consecutive joints
pub const SEGMENT: f32 = 2.0;
/// Radius of every vertex ring
pub const RADIUS: f32 = 0.5;
/// Bias of a ring vertex on its own joint (the rest goes to the parent)
const OWN_BIAS: f32 = 0.75;

#[derive(Debug, Clone, Copy)]
pub struct Tube {
    pub joints: usize,
    pub ring: usize,
    pub frames: usize,
}

impl Default for Tube {
    fn default() -> Self {
        Self {
            joints: 4,
            ring: 6,
            frames: 8,
        }
    }
}

/// MD5 stores unit quaternions with w <= 0
fn md5_quat(q: Quat) -> Quat {
    if q.w > 0.0 { -q } else { q }
}

fn ring_offset(tube: &Tube, k: usize) -> Vec3 {
    let angle = k as f32 / tube.ring as f32 * std::f32::consts::TAU;
    Vec3::new(RADIUS * angle.cos(), RADIUS * angle.sin(), 0.0)
}

/// Root translation of a frame
fn root_offset(frame: usize) -> Vec3 {
    Vec3::new(0.0, frame as f32 * 0.5, 0.0)
}

/// Parent-relative bend of every non-root joint in a frame
fn bend(frame: usize) -> Quat {
    md5_quat(Quat::from_rotation_x(frame as f32 * 0.15))
}

/// One joint weight: (joint, bias, joint-local position)
type WeightDef = (usize, f32, Vec3);

/// Weights of every body vertex, ring-major, then the cap's
fn vertex_weights(tube: &Tube) -> Vec<Vec<WeightDef>> {
    let mut weights = Vec::new();
    for j in 0..tube.joints {
        for k in 0..tube.ring {
            let offset = ring_offset(tube, k);
            if j == 0 {
                weights.push(vec![(0, 1.0, offset)]);
            } else {
                weights.push(vec![
                    (j, OWN_BIAS, offset),
                    (j - 1, 1.0 - OWN_BIAS, offset + Vec3::Z * SEGMENT),
                ]);
            }
        }
    }
    weights
}

fn cap_weights(tube: &Tube) -> Vec<Vec<WeightDef>> {
    let top = tube.joints - 1;
    let mut weights: Vec<Vec<WeightDef>> = (0..tube.ring)
        .map(|k| vec![(top, 1.0, ring_offset(tube, k) + Vec3::Z * 0.25)])
        .collect();
    weights.push(vec![(top, 1.0, Vec3::Z * 0.5)]);
    weights
}

fn body_triangles(tube: &Tube) -> Vec<[usize; 3]> {
    let mut tris = Vec::new();
    for j in 0..tube.joints - 1 {
        for k in 0..tube.ring {
            let a = j * tube.ring + k;
            let b = j * tube.ring + (k + 1) % tube.ring;
            let c = a + tube.ring;
            let d = b + tube.ring;
            tris.push([a, b, d]);
            tris.push([a, d, c]);
        }
    }
    tris
}

fn cap_triangles(tube: &Tube) -> Vec<[usize; 3]> {
    let center = tube.ring;
    (0..tube.ring)
        .map(|k| [center, k, (k + 1) % tube.ring])
        .collect()
}

fn write_mesh_block(
    out: &mut String,
    shader: &str,
    weights: &[Vec<WeightDef>],
    triangles: &[[usize; 3]],
    uv: impl Fn(usize) -> (f32, f32),
) {
    writeln!(out, "mesh {{").unwrap();
    writeln!(out, "\tshader \"{}\"", shader).unwrap();
    writeln!(out, "\n\tnumverts {}", weights.len()).unwrap();
    let mut start = 0;
    for (i, w) in weights.iter().enumerate() {
        let (s, t) = uv(i);
        writeln!(out, "\tvert {} ( {} {} ) {} {}", i, s, t, start, w.len()).unwrap();
        start += w.len();
    }
    writeln!(out, "\n\tnumtris {}", triangles.len()).unwrap();
    for (i, t) in triangles.iter().enumerate() {
        writeln!(out, "\ttri {} {} {} {}", i, t[0], t[1], t[2]).unwrap();
    }
    writeln!(out, "\n\tnumweights {}", start).unwrap();
    for (i, (joint, bias, p)) in weights.iter().flatten().enumerate() {
        writeln!(
            out,
            "\tweight {} {} {} ( {} {} {} )",
            i, joint, bias, p.x, p.y, p.z
        )
        .unwrap();
    }
    writeln!(out, "}}\n").unwrap();
}

/// Generate the .md5mesh text
pub fn md5mesh(tube: &Tube) -> String {
    let mut out = String::new();
    writeln!(out, "MD5Version 10").unwrap();
    writeln!(out, "commandline \"generated tube\"\n").unwrap();
    writeln!(out, "numJoints {}", tube.joints).unwrap();
    writeln!(out, "numMeshes 2\n").unwrap();

    writeln!(out, "joints {{").unwrap();
    for j in 0..tube.joints {
        let parent = if j == 0 { -1 } else { j as i64 - 1 };
        writeln!(
            out,
            "\t\"joint{}\"\t{} ( 0 0 {} ) ( 0 0 0 )\t\t// bind",
            j,
            parent,
            j as f32 * SEGMENT
        )
        .unwrap();
    }
    writeln!(out, "}}\n").unwrap();

    let ring = tube.ring;
    let rows = (tube.joints - 1) as f32;
    write_mesh_block(
        &mut out,
        "models/tube/body",
        &vertex_weights(tube),
        &body_triangles(tube),
        |i| ((i % ring) as f32 / ring as f32, (i / ring) as f32 / rows),
    );
    write_mesh_block(
        &mut out,
        "models/tube/cap",
        &cap_weights(tube),
        &cap_triangles(tube),
        |i| (i as f32 / ring as f32, 1.0),
    );
    out
}

/// Generate the .md5anim text (every joint animates all six channels)
pub fn md5anim(tube: &Tube) -> String {
    let mut out = String::new();
    writeln!(out, "MD5Version 10").unwrap();
    writeln!(out, "commandline \"generated bend\"\n").unwrap();
    writeln!(out, "numFrames {}", tube.frames).unwrap();
    writeln!(out, "numJoints {}", tube.joints).unwrap();
    writeln!(out, "frameRate 24").unwrap();
    writeln!(out, "numAnimatedComponents {}\n", tube.joints * 6).unwrap();

    writeln!(out, "hierarchy {{").unwrap();
    for j in 0..tube.joints {
        let parent = if j == 0 { -1 } else { j as i64 - 1 };
        writeln!(out, "\t\"joint{}\"\t{} 63 {}", j, parent, j * 6).unwrap();
    }
    writeln!(out, "}}\n").unwrap();

    writeln!(out, "bounds {{").unwrap();
    for f in 0..tube.frames {
        let (min, max) = reference_bounds(tube, f);
        writeln!(
            out,
            "\t( {} {} {} ) ( {} {} {} )",
            min.x, min.y, min.z, max.x, max.y, max.z
        )
        .unwrap();
    }
    writeln!(out, "}}\n").unwrap();

    writeln!(out, "baseframe {{").unwrap();
    for j in 0..tube.joints {
        let z = if j == 0 { 0.0 } else { SEGMENT };
        writeln!(out, "\t( 0 0 {} ) ( 0 0 0 )", z).unwrap();
    }
    writeln!(out, "}}\n").unwrap();

    for f in 0..tube.frames {
        writeln!(out, "frame {} {{", f).unwrap();
        for (p, q) in local_poses(tube, f) {
            writeln!(out, "\t{} {} {} {} {} {}", p.x, p.y, p.z, q.x, q.y, q.z).unwrap();
        }
        writeln!(out, "}}\n").unwrap();
    }
    out
}

/// Parent-relative poses written into a frame
pub fn local_poses(tube: &Tube, frame: usize) -> Vec<(Vec3, Quat)> {
    (0..tube.joints)
        .map(|j| {
            if j == 0 {
                (root_offset(frame), md5_quat(Quat::IDENTITY))
            } else {
                (Vec3::Z * SEGMENT, bend(frame))
            }
        })
        .collect()
}

/// Model-space joint poses of a frame
pub fn reference_joints(tube: &Tube, frame: usize) -> Vec<(Vec3, Quat)> {
    let mut world: Vec<(Vec3, Quat)> = Vec::new();
    for (j, (p, q)) in local_poses(tube, frame).into_iter().enumerate() {
        let pose = if j == 0 {
            (p, q)
        } else {
            let (pp, pq) = world[j - 1];
            (pq * p + pp, (pq * q).normalize())
        };
        world.push(pose);
    }
    world
}

fn skin(weights: &[Vec<WeightDef>], joints: &[(Vec3, Quat)]) -> Vec<Vec3> {
    weights
        .iter()
        .map(|ws| {
            ws.iter()
                .map(|&(j, bias, p)| (joints[j].0 + joints[j].1 * p) * bias)
                .sum()
        })
        .collect()
}

/// Skinned positions of a frame, body then cap
pub fn reference_positions(tube: &Tube, frame: usize) -> Vec<Vec3> {
    let joints = reference_joints(tube, frame);
    let mut positions = skin(&vertex_weights(tube), &joints);
    positions.extend(skin(&cap_weights(tube), &joints));
    positions
}

/// Bind-pose positions, body then cap
pub fn bind_positions(tube: &Tube) -> Vec<Vec3> {
    let joints: Vec<_> = (0..tube.joints)
        .map(|j| (Vec3::Z * (j as f32 * SEGMENT), Quat::IDENTITY))
        .collect();
    let mut positions = skin(&vertex_weights(tube), &joints);
    positions.extend(skin(&cap_weights(tube), &joints));
    positions
}

pub fn reference_bounds(tube: &Tube, frame: usize) -> (Vec3, Vec3) {
    let positions = reference_positions(tube, frame);
    let min = positions.iter().copied().fold(Vec3::splat(f32::MAX), Vec3::min);
    let max = positions.iter().copied().fold(Vec3::splat(f32::MIN), Vec3::max);
    (min, max)
}

pub fn vertex_count(tube: &Tube) -> usize {
    tube.joints * tube.ring + tube.ring + 1
}

pub fn triangle_count(tube: &Tube) -> usize {
    (tube.joints - 1) * tube.ring * 2 + tube.ring
}

/// The two-joint scenario: root at the origin, child 10 units up, one triangle fully
/// weighted to the child
pub const TWO_JOINT_MESH: &str = r#"MD5Version 10
commandline ""

numJoints 2
numMeshes 1

joints {
	"root"	-1 ( 0 0 0 ) ( 0 0 0 )
	"child"	0 ( 0 0 10 ) ( 0 0 0 )
}

mesh {
	shader "tri"

	numverts 3
	vert 0 ( 0 0 ) 0 1
	vert 1 ( 1 0 ) 1 1
	vert 2 ( 0 1 ) 2 1

	numtris 1
	tri 0 0 1 2

	numweights 3
	weight 0 1 1 ( 1 0 0 )
	weight 1 1 1 ( 0 2 0 )
	weight 2 1 1 ( 0 0 3 )
}
"#;

/// Offsets of the two-joint triangle's weights
pub const TWO_JOINT_OFFSETS: [Vec3; 3] = [
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(0.0, 2.0, 0.0),
    Vec3::new(0.0, 0.0, 3.0),
];

/// One frame, no animated channels
pub const TWO_JOINT_STILL_ANIM: &str = r#"MD5Version 10
commandline ""

numFrames 1
numJoints 2
frameRate 24
numAnimatedComponents 0

hierarchy {
	"root"	-1 0 0
	"child"	0 0 0
}

bounds {
	( 0 0 10 ) ( 1 2 13 )
}

baseframe {
	( 0 0 0 ) ( 0 0 0 )
	( 0 0 10 ) ( 0 0 0 )
}

frame 0 {
}
"#;

/// Same skeleton, `numFrames 0`
pub const TWO_JOINT_EMPTY_ANIM: &str = r#"MD5Version 10
commandline ""

numFrames 0
numJoints 2
frameRate 24
numAnimatedComponents 0

hierarchy {
	"root"	-1 0 0
	"child"	0 0 0
}

bounds {
}

baseframe {
	( 0 0 0 ) ( 0 0 0 )
	( 0 0 10 ) ( 0 0 0 )
}
"#;
