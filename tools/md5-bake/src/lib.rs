//! md5-bake library
//!
//! Converts MD5 (version 10) skeletal models into pre-skinned, per-frame quantized vertex
//! data with shared triangle, UV and draw command tables. Used by the `md5-bake` CLI.

pub mod bake;
pub mod error;
pub mod glcmds;
pub mod lexer;
pub mod manifest;
pub mod md5anim;
pub mod md5mesh;
pub mod model;
pub mod normals;
pub mod pose;
pub mod quantize;
pub mod skinning;

pub use error::{BakeError, Result};

// Pipeline entry points
pub use bake::{bake, bake_files, bake_str, bake_to_file, build_model, pack, split_documents};

// Parsed and baked model types
pub use md5anim::{parse_md5anim, AnimClip, ChannelFlags, JointInfo};
pub use md5mesh::{parse_md5mesh, MeshFile};
pub use model::{BakedVertex, Bounds, Frame, Joint, JointPose, Mesh, Model, Skeleton};

// Re-export the output format from bake-common
pub use bake_common::{BakedModelHeader, BakedModelView, BAKED_MODEL_EXT};
