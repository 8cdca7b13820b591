//! Skeleton + mesh parser (.md5mesh)
//!
//! ```text
//! MD5Version 10
//! commandline "..."
//! numJoints <n>
//! numMeshes <n>
//! joints {
//!     "name" parent ( px py pz ) ( qx qy qz )
//! }
//! mesh {
//!     shader "..."
//!     numverts <n>
//!     vert i ( s t ) startWeight countWeight
//!     numtris <n>
//!     tri i v0 v1 v2
//!     numweights <n>
//!     weight i joint bias ( x y z )
//! }
//! ```
//!
//! Joint poses in the mesh file are model-space (the bind pose).

use crate::error::{BakeError, Result};
use crate::lexer::{Lexer, Token};
use crate::model::{quat_from_xyz, Joint, JointPose, Mesh, Skeleton, Vertex, Weight};

/// Parsed contents of an .md5mesh document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshFile {
    pub commandline: String,
    pub skeleton: Skeleton,
    pub meshes: Vec<Mesh>,
}

/// Parse an .md5mesh document
///
/// Fails on any structural problem: wrong version, counts that disagree with the records,
/// out-of-order records, joints whose parent does not precede them, or references to
/// weights/joints/vertices that do not exist.
pub fn parse_md5mesh(src: &str) -> Result<MeshFile> {
    let mut lexer = Lexer::new(src);
    lexer.version()?;

    let mut file = MeshFile::default();
    let mut num_joints = None;
    let mut num_meshes = None;
    let mut joints_read = false;

    while let Some(token) = lexer.next_token() {
        match token {
            Token::Word("commandline") => {
                file.commandline = lexer.quoted("commandline")?.to_string();
            }
            Token::Word("numJoints") => {
                let n = lexer.count("numJoints")?;
                file.skeleton.joints.try_reserve_exact(n)?;
                num_joints = Some(n);
            }
            Token::Word("numMeshes") => {
                let n = lexer.count("numMeshes")?;
                file.meshes.try_reserve_exact(n)?;
                num_meshes = Some(n);
            }
            Token::Word("joints") => {
                let n = num_joints
                    .ok_or_else(|| BakeError::format(lexer.line(), "joints before numJoints"))?;
                if joints_read {
                    return Err(BakeError::format(lexer.line(), "duplicate joints block"));
                }
                parse_joints(&mut lexer, n, &mut file.skeleton.joints)?;
                joints_read = true;
            }
            Token::Word("mesh") => {
                if !joints_read {
                    return Err(BakeError::format(lexer.line(), "mesh before joints"));
                }
                let declared = num_meshes
                    .ok_or_else(|| BakeError::format(lexer.line(), "mesh before numMeshes"))?;
                if file.meshes.len() >= declared {
                    return Err(BakeError::format(
                        lexer.line(),
                        format!("more mesh blocks than numMeshes {}", declared),
                    ));
                }
                let mesh = parse_mesh(&mut lexer, file.skeleton.joints.len())?;
                file.meshes.push(mesh);
            }
            _ => {
                return Err(BakeError::format(
                    lexer.line(),
                    format!("unexpected {:?} in md5mesh", token),
                ));
            }
        }
    }

    if !joints_read {
        return Err(BakeError::UnexpectedEof { expected: "joints" });
    }
    let declared = num_meshes.unwrap_or(0);
    if file.meshes.len() != declared {
        return Err(BakeError::format(
            lexer.line(),
            format!(
                "numMeshes is {} but {} mesh blocks were found",
                declared,
                file.meshes.len()
            ),
        ));
    }

    tracing::debug!(
        "Parsed md5mesh: {} joints, {} meshes",
        file.skeleton.joints.len(),
        file.meshes.len()
    );
    Ok(file)
}

fn parse_joints(lexer: &mut Lexer<'_>, count: usize, joints: &mut Vec<Joint>) -> Result<()> {
    lexer.expect(Token::OpenBrace, "after joints")?;

    for index in 0..count {
        let name = lexer.quoted("joint name")?.to_string();
        let parent = parse_parent(lexer, &name, index)?;
        let position = lexer.vec3("joint position")?;
        let orientation = quat_from_xyz(lexer.vec3("joint orientation")?);
        joints.push(Joint {
            name,
            parent,
            pose: JointPose {
                position,
                orientation,
            },
        });
    }

    lexer.expect(Token::CloseBrace, "after last joint")
}

/// Parent index of joint `index`: -1 for a root, otherwise a smaller joint index
pub(crate) fn parse_parent(
    lexer: &mut Lexer<'_>,
    name: &str,
    index: usize,
) -> Result<Option<usize>> {
    let parent = lexer.int("joint parent")?;
    match parent {
        -1 => Ok(None),
        p if p < 0 => Err(BakeError::format(
            lexer.line(),
            format!("joint '{}' has invalid parent {}", name, p),
        )),
        p if p as usize >= index => Err(BakeError::SkeletonOrder {
            joint: name.to_string(),
            index,
            parent: p as usize,
        }),
        p => Ok(Some(p as usize)),
    }
}

/// Records inside a mesh block are appended in order; each declared count caps its list.
fn push_record<T>(
    lexer: &Lexer<'_>,
    list: &mut Vec<T>,
    declared: Option<usize>,
    kind: &'static str,
    item: T,
) -> Result<()> {
    match declared {
        None => Err(BakeError::format(
            lexer.line(),
            format!("{} record before its count", kind),
        )),
        Some(n) if list.len() >= n => Err(BakeError::format(
            lexer.line(),
            format!("more {} records than the declared {}", kind, n),
        )),
        Some(_) => {
            list.push(item);
            Ok(())
        }
    }
}

fn declare<T>(lexer: &mut Lexer<'_>, field: &'static str, list: &mut Vec<T>) -> Result<usize> {
    let n = lexer.count(field)?;
    list.try_reserve_exact(n)?;
    Ok(n)
}

fn parse_mesh(lexer: &mut Lexer<'_>, joint_count: usize) -> Result<Mesh> {
    let mesh_line = lexer.line();
    lexer.expect(Token::OpenBrace, "after mesh")?;

    let mut mesh = Mesh::default();
    let mut num_verts = None;
    let mut num_tris = None;
    let mut num_weights = None;

    loop {
        let token = lexer
            .next_token()
            .ok_or(BakeError::UnexpectedEof { expected: "'}' closing mesh" })?;
        match token {
            Token::CloseBrace => break,
            Token::Word("shader") => mesh.shader = lexer.quoted("shader")?.to_string(),
            Token::Word("numverts") => {
                num_verts = Some(declare(lexer, "numverts", &mut mesh.vertices)?);
            }
            Token::Word("numtris") => {
                num_tris = Some(declare(lexer, "numtris", &mut mesh.triangles)?);
            }
            Token::Word("numweights") => {
                num_weights = Some(declare(lexer, "numweights", &mut mesh.weights)?);
            }
            Token::Word("vert") => {
                lexer.index("vert", mesh.vertices.len())?;
                let vertex = Vertex {
                    uv: lexer.vec2("vert uv")?,
                    start_weight: lexer.count("vert startWeight")?,
                    weight_count: lexer.count("vert countWeight")?,
                };
                push_record(lexer, &mut mesh.vertices, num_verts, "vert", vertex)?;
            }
            Token::Word("tri") => {
                lexer.index("tri", mesh.triangles.len())?;
                let tri = [
                    lexer.count("tri vertex")?,
                    lexer.count("tri vertex")?,
                    lexer.count("tri vertex")?,
                ];
                push_record(lexer, &mut mesh.triangles, num_tris, "tri", tri)?;
            }
            Token::Word("weight") => {
                lexer.index("weight", mesh.weights.len())?;
                let weight = Weight {
                    joint: lexer.count("weight joint")?,
                    bias: lexer.float("weight bias")?,
                    position: lexer.vec3("weight position")?,
                };
                if weight.joint >= joint_count {
                    return Err(BakeError::format(
                        lexer.line(),
                        format!(
                            "weight {} references joint {}, skeleton has {}",
                            mesh.weights.len(),
                            weight.joint,
                            joint_count
                        ),
                    ));
                }
                push_record(lexer, &mut mesh.weights, num_weights, "weight", weight)?;
            }
            other => {
                return Err(BakeError::format(
                    lexer.line(),
                    format!("unexpected {:?} in mesh", other),
                ));
            }
        }
    }

    let counts = [
        ("vert", num_verts, mesh.vertices.len()),
        ("tri", num_tris, mesh.triangles.len()),
        ("weight", num_weights, mesh.weights.len()),
    ];
    for (kind, declared, found) in counts {
        if declared.unwrap_or(0) != found {
            return Err(BakeError::format(
                mesh_line,
                format!(
                    "mesh '{}' declares {} {} records but has {}",
                    mesh.shader,
                    declared.unwrap_or(0),
                    kind,
                    found
                ),
            ));
        }
    }

    validate_mesh(&mesh, mesh_line)?;
    Ok(mesh)
}

fn validate_mesh(mesh: &Mesh, line: usize) -> Result<()> {
    for (i, vertex) in mesh.vertices.iter().enumerate() {
        let end = vertex.start_weight.checked_add(vertex.weight_count);
        if end.is_none_or(|end| end > mesh.weights.len()) {
            return Err(BakeError::format(
                line,
                format!(
                    "vert {} uses weights {}+{}, mesh has {}",
                    i,
                    vertex.start_weight,
                    vertex.weight_count,
                    mesh.weights.len()
                ),
            ));
        }
    }

    for (i, tri) in mesh.triangles.iter().enumerate() {
        if let Some(&v) = tri.iter().find(|&&v| v >= mesh.vertices.len()) {
            return Err(BakeError::format(
                line,
                format!(
                    "tri {} references vert {}, mesh has {}",
                    i,
                    v,
                    mesh.vertices.len()
                ),
            ));
        }
    }

    Ok(())
}
