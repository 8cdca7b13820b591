//! Per-frame quantization of skinned vertices

use bake_common::{
    encode_normal_index, quant_params, quantize_position, FrameTransform, QuantizedVertex,
};
use glam::Vec3;

use crate::error::Result;
use crate::model::{BakedVertex, Bounds};

/// One frame ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedFrame {
    pub transform: FrameTransform,
    pub vertices: Vec<QuantizedVertex>,
    /// Bounds of the skinned positions, `None` for a frame without vertices
    pub bounds: Option<Bounds>,
}

/// Quantize a frame's positions against its own bounding box and encode its normals
pub fn quantize_frame(vertices: &[BakedVertex]) -> Result<QuantizedFrame> {
    let bounds = Bounds::from_points(vertices.iter().map(|v| v.position));
    let (min, max) = bounds.map_or((Vec3::ZERO, Vec3::ZERO), |b| (b.min, b.max));

    let size = max - min;
    if bounds.is_some() && size.min_element() <= 0.0 {
        tracing::debug!("Frame has a flat axis (extent {:?}), using minimum scale", size);
    }
    let (translate, scale) = quant_params(min, max);

    let mut quantized = Vec::new();
    quantized.try_reserve_exact(vertices.len())?;
    quantized.extend(vertices.iter().map(|v| QuantizedVertex {
        position: quantize_position(v.position, translate, scale),
        normal_index: encode_normal_index(v.normal),
    }));

    Ok(QuantizedFrame {
        transform: FrameTransform {
            translate: translate.to_array(),
            scale: scale.to_array(),
        },
        vertices: quantized,
        bounds,
    })
}
