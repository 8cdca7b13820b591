//! Baked model binary format (.bkmd)
//!
//! One file holds every animation frame of a skinned model, already skinned and quantized.
//! All values are little-endian.
//!
//! # Layout
//! ```text
//! 0x00: magic        [u8; 4] = "BKMD"
//! 0x04: version      u32
//! 0x08: frame_size   u32 (FRAME_TRANSFORM_SIZE + num_vertices * QUANTIZED_VERTEX_SIZE)
//! 0x0C: num_skins    u32 (one per mesh)
//! 0x10: num_vertices u32 (per frame, all meshes)
//! 0x14: num_st       u32 (one UV per vertex)
//! 0x18: num_tris     u32
//! 0x1C: num_glcmds   u32 (32-bit words)
//! 0x20: num_frames   u32
//! 0x24: num_meshes   u32
//! 0x28: ofs_skins    u32
//! 0x2C: ofs_st       u32
//! 0x30: ofs_tris     u32
//! 0x34: ofs_frames   u32
//! 0x38: ofs_glcmds   u32
//! 0x3C: ofs_end      u32
//! 0x40: skins   (num_skins × 64 bytes, NUL padded)
//! var:  frames  (num_frames × frame_size)
//! var:  glcmds  (num_glcmds × 4 bytes)
//! var:  tris    (num_tris × 12 bytes)
//! var:  st      (num_st × 8 bytes)
//! ```
//!
//! Frame record: `translate [f32; 3]`, `scale [f32; 3]`, then one quantized vertex per model
//! vertex (`position [u16; 3]`, `normal_index u8`, one padding byte). Vertices are ordered
//! mesh-major, then by vertex index within the mesh.

use glam::Vec3;

use crate::packing::{decode_normal_index, dequantize_position};

/// Magic bytes at the start of every baked model
pub const BAKED_MODEL_MAGIC: [u8; 4] = *b"BKMD";

/// Current format version
pub const BAKED_MODEL_VERSION: u32 = 1;

/// File extension for baked models
pub const BAKED_MODEL_EXT: &str = "bkmd";

/// Size of one skin name entry (NUL padded)
pub const SKIN_NAME_SIZE: usize = 64;

/// Size of a frame's translate + scale prefix
pub const FRAME_TRANSFORM_SIZE: usize = 24;

/// Size of one quantized vertex (u16 × 3 + u8 normal index + pad)
pub const QUANTIZED_VERTEX_SIZE: usize = 8;

/// Size of one triangle record (u16 × 3 vertex indices + u16 × 3 UV indices)
pub const TRIANGLE_SIZE: usize = 12;

/// Size of one UV record (f32 × 2)
pub const ST_SIZE: usize = 8;

/// Size of one draw command word
pub const GLCMD_WORD_SIZE: usize = 4;

/// Element counts that determine the whole file layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BakedModelCounts {
    pub num_meshes: u32,
    pub num_vertices: u32,
    pub num_tris: u32,
    pub num_glcmds: u32,
    pub num_frames: u32,
}

/// Baked model header (64 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct BakedModelHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub frame_size: u32,
    pub num_skins: u32,
    pub num_vertices: u32,
    pub num_st: u32,
    pub num_tris: u32,
    pub num_glcmds: u32,
    pub num_frames: u32,
    pub num_meshes: u32,
    pub ofs_skins: u32,
    pub ofs_st: u32,
    pub ofs_tris: u32,
    pub ofs_frames: u32,
    pub ofs_glcmds: u32,
    pub ofs_end: u32,
}

impl BakedModelHeader {
    pub const SIZE: usize = 64;

    /// Build a header with every offset computed from the counts
    ///
    /// Returns `None` if the resulting file would not be addressable with u32 offsets.
    pub fn new(counts: BakedModelCounts) -> Option<Self> {
        let size = |count: u32, each: usize| (count as u64) * (each as u64);

        let frame_size =
            FRAME_TRANSFORM_SIZE as u64 + size(counts.num_vertices, QUANTIZED_VERTEX_SIZE);
        let ofs_skins = Self::SIZE as u64;
        let ofs_frames = ofs_skins + size(counts.num_meshes, SKIN_NAME_SIZE);
        let ofs_glcmds = ofs_frames + counts.num_frames as u64 * frame_size;
        let ofs_tris = ofs_glcmds + size(counts.num_glcmds, GLCMD_WORD_SIZE);
        let ofs_st = ofs_tris + size(counts.num_tris, TRIANGLE_SIZE);
        let ofs_end = ofs_st + size(counts.num_vertices, ST_SIZE);

        if ofs_end > u32::MAX as u64 {
            return None;
        }

        Some(Self {
            magic: BAKED_MODEL_MAGIC,
            version: BAKED_MODEL_VERSION,
            frame_size: frame_size as u32,
            num_skins: counts.num_meshes,
            num_vertices: counts.num_vertices,
            num_st: counts.num_vertices,
            num_tris: counts.num_tris,
            num_glcmds: counts.num_glcmds,
            num_frames: counts.num_frames,
            num_meshes: counts.num_meshes,
            ofs_skins: ofs_skins as u32,
            ofs_st: ofs_st as u32,
            ofs_tris: ofs_tris as u32,
            ofs_frames: ofs_frames as u32,
            ofs_glcmds: ofs_glcmds as u32,
            ofs_end: ofs_end as u32,
        })
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        let fields = [
            self.version,
            self.frame_size,
            self.num_skins,
            self.num_vertices,
            self.num_st,
            self.num_tris,
            self.num_glcmds,
            self.num_frames,
            self.num_meshes,
            self.ofs_skins,
            self.ofs_st,
            self.ofs_tris,
            self.ofs_frames,
            self.ofs_glcmds,
            self.ofs_end,
        ];
        for (i, field) in fields.iter().enumerate() {
            let at = 4 + i * 4;
            bytes[at..at + 4].copy_from_slice(&field.to_le_bytes());
        }
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let field = |i: usize| read_u32(bytes, 4 + i * 4);
        Some(Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            version: field(0),
            frame_size: field(1),
            num_skins: field(2),
            num_vertices: field(3),
            num_st: field(4),
            num_tris: field(5),
            num_glcmds: field(6),
            num_frames: field(7),
            num_meshes: field(8),
            ofs_skins: field(9),
            ofs_st: field(10),
            ofs_tris: field(11),
            ofs_frames: field(12),
            ofs_glcmds: field(13),
            ofs_end: field(14),
        })
    }

    /// Element counts recorded in this header
    pub fn counts(&self) -> BakedModelCounts {
        BakedModelCounts {
            num_meshes: self.num_meshes,
            num_vertices: self.num_vertices,
            num_tris: self.num_tris,
            num_glcmds: self.num_glcmds,
            num_frames: self.num_frames,
        }
    }

    /// Validate header
    ///
    /// Checks magic, version and that every offset matches the layout implied by the counts.
    pub fn validate(&self) -> bool {
        self.magic == BAKED_MODEL_MAGIC
            && self.version == BAKED_MODEL_VERSION
            && self.num_frames > 0
            && Self::new(self.counts()).as_ref() == Some(self)
    }

    /// Total file size (header + all sections)
    pub fn file_size(&self) -> usize {
        self.ofs_end as usize
    }
}

#[inline]
fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline]
fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_bits(read_u32(bytes, at))
}

/// Encode a skin name into a fixed-size NUL padded entry
///
/// Names longer than `SKIN_NAME_SIZE - 1` bytes are cut at a char boundary. The second value
/// reports whether that happened.
pub fn encode_skin_name(name: &str) -> ([u8; SKIN_NAME_SIZE], bool) {
    let mut entry = [0u8; SKIN_NAME_SIZE];
    let mut len = name.len().min(SKIN_NAME_SIZE - 1);
    while !name.is_char_boundary(len) {
        len -= 1;
    }
    entry[..len].copy_from_slice(&name.as_bytes()[..len]);
    (entry, len < name.len())
}

/// Per-frame dequantization parameters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTransform {
    pub translate: [f32; 3],
    pub scale: [f32; 3],
}

impl FrameTransform {
    pub fn to_bytes(&self) -> [u8; FRAME_TRANSFORM_SIZE] {
        let mut bytes = [0u8; FRAME_TRANSFORM_SIZE];
        for (i, v) in self.translate.iter().chain(self.scale.iter()).enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < FRAME_TRANSFORM_SIZE {
            return None;
        }
        let f = |i: usize| read_f32(bytes, i * 4);
        Some(Self {
            translate: [f(0), f(1), f(2)],
            scale: [f(3), f(4), f(5)],
        })
    }
}

/// One quantized vertex of a frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuantizedVertex {
    pub position: [u16; 3],
    pub normal_index: u8,
}

impl QuantizedVertex {
    pub fn to_bytes(&self) -> [u8; QUANTIZED_VERTEX_SIZE] {
        let mut bytes = [0u8; QUANTIZED_VERTEX_SIZE];
        for (i, p) in self.position.iter().enumerate() {
            bytes[i * 2..i * 2 + 2].copy_from_slice(&p.to_le_bytes());
        }
        bytes[6] = self.normal_index;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < QUANTIZED_VERTEX_SIZE {
            return None;
        }
        Some(Self {
            position: [read_u16(bytes, 0), read_u16(bytes, 2), read_u16(bytes, 4)],
            normal_index: bytes[6],
        })
    }
}

/// Triangle record: vertex and UV index per corner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BakedTriangle {
    pub vertex: [u16; 3],
    pub st: [u16; 3],
}

impl BakedTriangle {
    pub fn to_bytes(&self) -> [u8; TRIANGLE_SIZE] {
        let mut bytes = [0u8; TRIANGLE_SIZE];
        for (i, v) in self.vertex.iter().chain(self.st.iter()).enumerate() {
            bytes[i * 2..i * 2 + 2].copy_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < TRIANGLE_SIZE {
            return None;
        }
        let h = |i: usize| read_u16(bytes, i * 2);
        Some(Self {
            vertex: [h(0), h(1), h(2)],
            st: [h(3), h(4), h(5)],
        })
    }
}

/// Zero-copy reader over a complete baked model buffer
#[derive(Debug, Clone, Copy)]
pub struct BakedModelView<'a> {
    header: BakedModelHeader,
    data: &'a [u8],
}

impl<'a> BakedModelView<'a> {
    /// Parse and validate a baked model buffer
    ///
    /// Returns `None` if the header is invalid or the buffer is shorter than `ofs_end`.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let header = BakedModelHeader::from_bytes(data)?;
        if !header.validate() || data.len() < header.file_size() {
            return None;
        }
        Some(Self { header, data })
    }

    pub fn header(&self) -> &BakedModelHeader {
        &self.header
    }

    /// Skin name of a mesh (up to the first NUL)
    pub fn skin_name(&self, mesh: usize) -> Option<&'a str> {
        if mesh >= self.header.num_skins as usize {
            return None;
        }
        let at = self.header.ofs_skins as usize + mesh * SKIN_NAME_SIZE;
        let entry = &self.data[at..at + SKIN_NAME_SIZE];
        let len = entry.iter().position(|&b| b == 0).unwrap_or(SKIN_NAME_SIZE);
        std::str::from_utf8(&entry[..len]).ok()
    }

    pub fn frame(&self, index: usize) -> Option<FrameView<'a>> {
        if index >= self.header.num_frames as usize {
            return None;
        }
        let size = self.header.frame_size as usize;
        let at = self.header.ofs_frames as usize + index * size;
        let record = &self.data[at..at + size];
        Some(FrameView {
            transform: FrameTransform::from_bytes(record)?,
            vertices: &record[FRAME_TRANSFORM_SIZE..],
        })
    }

    pub fn frames(&self) -> impl Iterator<Item = FrameView<'a>> + '_ {
        (0..self.header.num_frames as usize).filter_map(move |i| self.frame(i))
    }

    pub fn triangle(&self, index: usize) -> Option<BakedTriangle> {
        if index >= self.header.num_tris as usize {
            return None;
        }
        let at = self.header.ofs_tris as usize + index * TRIANGLE_SIZE;
        BakedTriangle::from_bytes(&self.data[at..])
    }

    pub fn triangles(&self) -> impl Iterator<Item = BakedTriangle> + '_ {
        (0..self.header.num_tris as usize).filter_map(move |i| self.triangle(i))
    }

    pub fn st(&self, index: usize) -> Option<[f32; 2]> {
        if index >= self.header.num_st as usize {
            return None;
        }
        let at = self.header.ofs_st as usize + index * ST_SIZE;
        Some([read_f32(self.data, at), read_f32(self.data, at + 4)])
    }

    /// Raw draw command words
    pub fn glcmds(&self) -> Vec<i32> {
        let at = self.header.ofs_glcmds as usize;
        (0..self.header.num_glcmds as usize)
            .map(|i| read_u32(self.data, at + i * GLCMD_WORD_SIZE) as i32)
            .collect()
    }
}

/// One frame record inside a [`BakedModelView`]
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub transform: FrameTransform,
    vertices: &'a [u8],
}

impl<'a> FrameView<'a> {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / QUANTIZED_VERTEX_SIZE
    }

    pub fn vertex(&self, index: usize) -> Option<QuantizedVertex> {
        let at = index.checked_mul(QUANTIZED_VERTEX_SIZE)?;
        QuantizedVertex::from_bytes(self.vertices.get(at..)?)
    }

    /// Dequantized position of a vertex
    pub fn position(&self, index: usize) -> Option<Vec3> {
        let v = self.vertex(index)?;
        Some(dequantize_position(
            v.position,
            Vec3::from_array(self.transform.translate),
            Vec3::from_array(self.transform.scale),
        ))
    }

    /// Canonical normal of a vertex
    pub fn normal(&self, index: usize) -> Option<Vec3> {
        Some(decode_normal_index(self.vertex(index)?.normal_index))
    }
}
