//! Shared types and utilities for baked skeletal models
//!
//! This crate provides the pieces shared between:
//! - `md5-bake` (asset pipeline)
//! - renderers and tools that read `.bkmd` files
//!
//! # Modules
//!
//! - [`packing`] - Vertex data packing utilities (f32 → u16 positions, u8 normal indices)
//! - [`formats`] - Baked model binary layout and a zero-copy reader

pub mod formats;
pub mod packing;

// Re-export commonly used packing items
pub use packing::{
    MIN_QUANT_SCALE, NUM_VERTEX_NORMALS, QUANT_MAX, decode_normal_index, dequantize_position,
    encode_normal_index, normal_table, quant_params, quantize_position,
};

// Re-export commonly used format items
pub use formats::{
    BAKED_MODEL_EXT, BAKED_MODEL_MAGIC, BAKED_MODEL_VERSION, BakedModelCounts, BakedModelHeader,
    BakedModelView, BakedTriangle, FRAME_TRANSFORM_SIZE, FrameTransform, FrameView, GlCommand,
    GlPrimitive, GlVertex, QUANTIZED_VERTEX_SIZE, QuantizedVertex, SKIN_NAME_SIZE, ST_SIZE,
    TRIANGLE_SIZE, decode_glcmds, encode_skin_name,
};
