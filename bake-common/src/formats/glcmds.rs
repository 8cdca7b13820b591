//! Draw command stream ("glcmds")
//!
//! A flat list of 32-bit words that lets a renderer replay a mesh as triangle strips and fans
//! without the triangle table:
//!
//! ```text
//! count: i32          (> 0: strip of `count` vertices, < 0: fan of `-count` vertices)
//! count × { u: f32, v: f32, vertex: i32 }
//! ...
//! 0                   (end of one mesh's commands)
//! ```
//!
//! Meshes appear in skin order, each terminated by its own `0` word.

/// Primitive type of one draw command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlPrimitive {
    Strip,
    Fan,
}

/// One vertex reference inside a draw command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlVertex {
    pub uv: [f32; 2],
    pub index: u32,
}

/// A single strip or fan
#[derive(Debug, Clone, PartialEq)]
pub struct GlCommand {
    pub primitive: GlPrimitive,
    pub vertices: Vec<GlVertex>,
}

impl GlCommand {
    /// Append this command's words to a stream
    pub fn encode_into(&self, words: &mut Vec<i32>) {
        let count = self.vertices.len() as i32;
        words.push(match self.primitive {
            GlPrimitive::Strip => count,
            GlPrimitive::Fan => -count,
        });
        for v in &self.vertices {
            words.push(v.uv[0].to_bits() as i32);
            words.push(v.uv[1].to_bits() as i32);
            words.push(v.index as i32);
        }
    }

    /// Number of words [`encode_into`](Self::encode_into) appends
    pub fn word_count(&self) -> usize {
        1 + self.vertices.len() * 3
    }

    /// Expand into triangles with the winding a strip/fan renderer produces
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        let idx: Vec<u32> = self.vertices.iter().map(|v| v.index).collect();
        let n = idx.len();
        if n < 3 {
            return Vec::new();
        }
        (0..n - 2)
            .map(|i| match self.primitive {
                GlPrimitive::Fan => [idx[0], idx[i + 1], idx[i + 2]],
                GlPrimitive::Strip if i % 2 == 0 => [idx[i], idx[i + 1], idx[i + 2]],
                GlPrimitive::Strip => [idx[i + 1], idx[i], idx[i + 2]],
            })
            .collect()
    }
}

/// Decode a complete draw command stream into per-mesh command lists
///
/// Returns `None` if a command runs past the end of the stream or a mesh is missing its
/// terminator.
pub fn decode_glcmds(words: &[i32]) -> Option<Vec<Vec<GlCommand>>> {
    let mut meshes = Vec::new();
    let mut current = Vec::new();
    let mut pos = 0;

    while pos < words.len() {
        let count = words[pos];
        pos += 1;
        if count == 0 {
            meshes.push(std::mem::take(&mut current));
            continue;
        }

        let primitive = if count > 0 {
            GlPrimitive::Strip
        } else {
            GlPrimitive::Fan
        };
        let n = count.unsigned_abs() as usize;
        let body = words.get(pos..pos + n * 3)?;
        pos += n * 3;

        let vertices = body
            .chunks_exact(3)
            .map(|w| GlVertex {
                uv: [f32::from_bits(w[0] as u32), f32::from_bits(w[1] as u32)],
                index: w[2] as u32,
            })
            .collect();
        current.push(GlCommand {
            primitive,
            vertices,
        });
    }

    if !current.is_empty() {
        return None;
    }
    Some(meshes)
}
