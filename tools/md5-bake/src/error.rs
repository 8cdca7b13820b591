//! Error type shared by every baking stage

use std::collections::TryReserveError;

use thiserror::Error;

/// MD5 format version accepted by the parsers
pub const MD5_VERSION: i64 = 10;

/// Errors produced while parsing, composing, skinning or packing a model
///
/// Any error aborts the whole bake; no partial output is produced.
#[derive(Debug, Error)]
pub enum BakeError {
    #[error("unsupported MD5Version {found} (only version 10 is supported)")]
    UnsupportedVersion { found: i64 },

    #[error("line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("line {line}: malformed {field}: {found:?}")]
    MalformedNumber {
        line: usize,
        field: &'static str,
        found: String,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },

    #[error("joint '{joint}' (index {index}) has parent {parent}, parents must precede children")]
    SkeletonOrder {
        joint: String,
        index: usize,
        parent: usize,
    },

    #[error("animation has {anim} joints but the skeleton has {mesh}")]
    JointCountMismatch { mesh: usize, anim: usize },

    #[error("animation joint {index} ('{anim}') does not match skeleton joint '{mesh}'")]
    HierarchyMismatch {
        index: usize,
        mesh: String,
        anim: String,
    },

    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("model has {count} vertices, at most {max} fit 16-bit indices")]
    TooManyVertices { count: usize, max: usize },

    #[error("baked model would exceed the 4 GiB offset range")]
    OutputTooLarge,

    #[error("out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
}

impl BakeError {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T, E = BakeError> = std::result::Result<T, E>;
