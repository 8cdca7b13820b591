//! Baking pipeline: parse → pose → skin → normals → quantize → pack

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use bake_common::{encode_skin_name, BakedModelCounts, BakedModelHeader, BakedTriangle};

use crate::error::{BakeError, Result};
use crate::glcmds::build_glcmds;
use crate::lexer::{Lexer, Token};
use crate::md5anim::{parse_md5anim, DEFAULT_FRAME_RATE};
use crate::md5mesh::parse_md5mesh;
use crate::model::{BakedVertex, Bounds, Frame, JointPose, Model};
use crate::normals::compute_normals;
use crate::quantize::quantize_frame;
use crate::skinning::skin_meshes;

/// Largest vertex count addressable by the 16-bit triangle indices
pub const MAX_VERTICES: usize = u16::MAX as usize + 1;

const VERSION_KEYWORD: &str = "MD5Version";

/// Split concatenated mesh + animation text at the second `MD5Version` keyword
///
/// Only a bare keyword token counts; occurrences inside quoted strings or `//` comments are
/// skipped. Returns the mesh document and, if present, the animation document.
pub fn split_documents(src: &str) -> (&str, Option<&str>) {
    let mut lexer = Lexer::new(src);
    let mut seen = 0;
    while let Some(token) = lexer.next_token() {
        if token == Token::Word(VERSION_KEYWORD) {
            seen += 1;
            if seen == 2 {
                let at = lexer.offset();
                return (&src[..at], Some(&src[at..]));
            }
        }
    }
    (src, None)
}

/// Parse both documents and produce a fully skinned model with normals
///
/// Without an animation, or with a clip of zero frames, the model gets a single frame
/// holding the bind pose.
pub fn build_model(mesh_src: &str, anim_src: Option<&str>) -> Result<Model> {
    let mesh_file = parse_md5mesh(mesh_src)?;
    let mut model = Model {
        skeleton: mesh_file.skeleton,
        meshes: mesh_file.meshes,
        frames: Vec::new(),
        frame_rate: DEFAULT_FRAME_RATE,
    };
    let vertex_count = model.vertex_count();

    if let Some(anim_src) = anim_src {
        let clip = parse_md5anim(anim_src, &model.skeleton)?;
        model.frame_rate = clip.frame_rate;
        model.frames.try_reserve_exact(clip.frame_count())?;
        for index in 0..clip.frame_count() {
            let joints = clip.frame_pose(index)?;
            let frame = skin_frame(&model, joints, clip.bounds.get(index).copied(), vertex_count)?;
            model.frames.push(frame);
        }
    }

    if model.frames.is_empty() {
        tracing::debug!("No animation frames, baking the bind pose");
        let joints = model.skeleton.bind_pose();
        let frame = skin_frame(&model, joints, None, vertex_count)?;
        model.frames.try_reserve_exact(1)?;
        model.frames.push(frame);
    }
    tracing::debug!(
        "Skinned {} frames of {} vertices",
        model.frames.len(),
        vertex_count
    );

    compute_normals(&mut model);
    Ok(model)
}

fn skin_frame(
    model: &Model,
    joints: Vec<JointPose>,
    parsed_bounds: Option<Bounds>,
    vertex_count: usize,
) -> Result<Frame> {
    let mut vertices = Vec::new();
    vertices.try_reserve_exact(vertex_count)?;
    vertices.resize(vertex_count, BakedVertex::default());
    skin_meshes(&model.meshes, &joints, &mut vertices)?;
    Ok(Frame {
        parsed_bounds,
        joints,
        vertices,
    })
}

fn to_u32(count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| BakeError::OutputTooLarge)
}

/// Pack a skinned model into the baked binary layout
///
/// Consumes the model; all intermediate data is released when this returns.
pub fn pack(model: Model) -> Result<Vec<u8>> {
    let num_vertices = model.vertex_count();
    if num_vertices > MAX_VERTICES {
        return Err(BakeError::TooManyVertices {
            count: num_vertices,
            max: MAX_VERTICES,
        });
    }

    let glcmds = build_glcmds(&model.meshes)?;
    let counts = BakedModelCounts {
        num_meshes: to_u32(model.meshes.len())?,
        num_vertices: to_u32(num_vertices)?,
        num_tris: to_u32(model.triangle_count())?,
        num_glcmds: to_u32(glcmds.len())?,
        num_frames: to_u32(model.frames.len())?,
    };
    let header = BakedModelHeader::new(counts).ok_or(BakeError::OutputTooLarge)?;

    let mut out = Vec::new();
    out.try_reserve_exact(header.file_size())?;
    out.extend_from_slice(&header.to_bytes());

    // Skins
    for mesh in &model.meshes {
        let (name, truncated) = encode_skin_name(&mesh.shader);
        if truncated {
            tracing::warn!("Skin name {:?} truncated to fit the name field", mesh.shader);
        }
        out.extend_from_slice(&name);
    }

    // Frames
    for (index, frame) in model.frames.iter().enumerate() {
        let quantized = quantize_frame(&frame.vertices)?;
        if let (Some(parsed), Some(computed)) = (frame.parsed_bounds, quantized.bounds) {
            let drift = (parsed.min - computed.min)
                .abs()
                .max((parsed.max - computed.max).abs())
                .max_element();
            tracing::trace!("Frame {}: bounds differ from the clip's by {}", index, drift);
        }
        out.extend_from_slice(&quantized.transform.to_bytes());
        for vertex in &quantized.vertices {
            out.extend_from_slice(&vertex.to_bytes());
        }
    }
    debug_assert_eq!(out.len(), header.ofs_glcmds as usize);

    // Draw commands
    for word in &glcmds {
        out.extend_from_slice(&word.to_le_bytes());
    }

    // Triangles, indices into the model-wide vertex and st arrays
    for (mesh, offset) in model.meshes.iter().zip(model.vertex_offsets()) {
        for tri in &mesh.triangles {
            let index = tri.map(|v| (offset + v) as u16);
            let triangle = BakedTriangle {
                vertex: index,
                st: index,
            };
            out.extend_from_slice(&triangle.to_bytes());
        }
    }

    // Texture coordinates, one per vertex
    for vertex in model.meshes.iter().flat_map(|m| &m.vertices) {
        out.extend_from_slice(&vertex.uv.x.to_le_bytes());
        out.extend_from_slice(&vertex.uv.y.to_le_bytes());
    }

    debug_assert_eq!(out.len(), header.file_size());
    tracing::debug!(
        "Packed {} bytes: {} skins, {} frames, {} vertices, {} triangles, {} glcmd words",
        out.len(),
        header.num_skins,
        header.num_frames,
        header.num_vertices,
        header.num_tris,
        header.num_glcmds
    );
    Ok(out)
}

/// Bake mesh text and optional animation text into the binary layout
pub fn bake(mesh_src: &str, anim_src: Option<&str>) -> Result<Vec<u8>> {
    pack(build_model(mesh_src, anim_src)?)
}

/// Bake a single text holding the mesh document optionally followed by the animation
pub fn bake_str(src: &str) -> Result<Vec<u8>> {
    let (mesh_src, anim_src) = split_documents(src);
    bake(mesh_src, anim_src)
}

/// Read and bake source files
///
/// Without `anim`, `input` may hold the mesh and animation concatenated.
pub fn bake_files(input: &Path, anim: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    let src = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read input: {:?}", input))?;

    let baked = match anim {
        Some(anim) => {
            let anim_src = std::fs::read_to_string(anim)
                .with_context(|| format!("Failed to read animation: {:?}", anim))?;
            bake(&src, Some(&anim_src))
        }
        None => bake_str(&src),
    };
    baked.with_context(|| format!("Failed to bake {:?}", input))
}

/// Bake source files and write the result to `output`
pub fn bake_to_file(input: &Path, anim: Option<&Path>, output: &Path) -> anyhow::Result<()> {
    let data = bake_files(input, anim)?;

    let file =
        File::create(output).with_context(|| format!("Failed to create output: {:?}", output))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&data)
        .and_then(|_| writer.flush())
        .with_context(|| format!("Failed to write output: {:?}", output))?;

    if let Some(header) = BakedModelHeader::from_bytes(&data) {
        tracing::info!(
            "Baked {:?}: {} meshes, {} vertices, {} triangles, {} frames ({} bytes)",
            input,
            header.num_meshes,
            header.num_vertices,
            header.num_tris,
            header.num_frames,
            data.len()
        );
    }
    Ok(())
}
