//! Binary formats for baked skeletal models
//!
//! - [`baked_model`] - header, record encodings and the `BakedModelView` reader
//! - [`glcmds`] - triangle strip/fan draw command stream

mod baked_model;
mod glcmds;

pub use baked_model::*;
pub use glcmds::*;
