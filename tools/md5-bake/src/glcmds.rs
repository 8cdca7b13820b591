//! Draw command builder
//!
//! Greedily covers each mesh's triangles with strips and fans. Starting from every triangle
//! not yet covered, both primitive types are grown from each of the three corners and the
//! longest run wins. Growth only follows triangles that share the run's open edge with
//! matching winding, so the expanded commands reproduce the source triangles.

use bake_common::{GlCommand, GlPrimitive, GlVertex};
use hashbrown::HashMap;

use crate::error::Result;
use crate::model::{Mesh, Triangle};

/// Directed edge (from, to) of a triangle's winding
type Edge = (usize, usize);

struct RunBuilder<'a> {
    triangles: &'a [Triangle],
    /// Triangles containing each directed edge, in triangle order, with their opposite vertex
    edges: HashMap<Edge, Vec<(usize, usize)>>,
    /// Triangles already emitted in a command
    used: Vec<bool>,
    /// Triangles claimed by the run being measured
    claimed: Vec<bool>,
}

/// A candidate command: its vertex sequence and the triangles it covers
struct Run {
    primitive: GlPrimitive,
    vertices: Vec<usize>,
    triangles: Vec<usize>,
}

impl<'a> RunBuilder<'a> {
    fn new(triangles: &'a [Triangle]) -> Self {
        let mut edges: HashMap<Edge, Vec<(usize, usize)>> = HashMap::new();
        for (j, t) in triangles.iter().enumerate() {
            for k in 0..3 {
                edges
                    .entry((t[k], t[(k + 1) % 3]))
                    .or_default()
                    .push((j, t[(k + 2) % 3]));
            }
        }
        Self {
            triangles,
            edges,
            used: vec![false; triangles.len()],
            claimed: vec![false; triangles.len()],
        }
    }

    /// Find an unused, unclaimed triangle after `start` containing the directed edge a→b
    fn find_next(&self, start: usize, a: usize, b: usize) -> Option<(usize, usize)> {
        self.edges
            .get(&(a, b))?
            .iter()
            .copied()
            .find(|&(j, _)| j > start && !self.used[j] && !self.claimed[j])
    }

    fn grow(&mut self, start: usize, corner: usize, primitive: GlPrimitive) -> Run {
        let t = self.triangles[start];
        let v0 = t[corner % 3];
        let v1 = t[(corner + 1) % 3];
        let v2 = t[(corner + 2) % 3];

        let mut run = Run {
            primitive,
            vertices: vec![v0, v1, v2],
            triangles: vec![start],
        };
        self.claimed[start] = true;

        let (mut m1, mut m2) = match primitive {
            GlPrimitive::Strip => (v2, v1),
            GlPrimitive::Fan => (v0, v2),
        };

        while let Some((j, next)) = self.find_next(start, m1, m2) {
            match primitive {
                GlPrimitive::Strip if run.triangles.len() % 2 == 1 => m2 = next,
                GlPrimitive::Strip => m1 = next,
                GlPrimitive::Fan => m2 = next,
            }
            run.vertices.push(next);
            run.triangles.push(j);
            self.claimed[j] = true;
        }

        for &j in &run.triangles {
            self.claimed[j] = false;
        }
        run
    }

    fn best_run(&mut self, start: usize) -> Run {
        let attempts = [GlPrimitive::Fan, GlPrimitive::Strip]
            .into_iter()
            .flat_map(|primitive| (0..3).map(move |corner| (primitive, corner)));

        let mut best = self.grow(start, 0, GlPrimitive::Fan);
        for (primitive, corner) in attempts.skip(1) {
            let run = self.grow(start, corner, primitive);
            if run.triangles.len() > best.triangles.len() {
                best = run;
            }
        }
        best
    }
}

/// Build the draw commands of one mesh
///
/// Vertex indices are offset by `vertex_offset` so they address the model-wide vertex array.
pub fn build_mesh_commands(mesh: &Mesh, vertex_offset: usize) -> Vec<GlCommand> {
    let mut builder = RunBuilder::new(&mesh.triangles);
    let mut commands = Vec::new();

    for start in 0..mesh.triangles.len() {
        if builder.used[start] {
            continue;
        }
        let run = builder.best_run(start);
        for &j in &run.triangles {
            builder.used[j] = true;
        }

        let vertices = run
            .vertices
            .iter()
            .map(|&v| GlVertex {
                uv: mesh.vertices[v].uv.to_array(),
                index: (vertex_offset + v) as u32,
            })
            .collect();
        commands.push(GlCommand {
            primitive: run.primitive,
            vertices,
        });
    }

    commands
}

/// Build the complete draw command stream for a set of meshes
///
/// Each mesh's commands are followed by a `0` terminator word.
pub fn build_glcmds(meshes: &[Mesh]) -> Result<Vec<i32>> {
    let mut per_mesh = Vec::new();
    per_mesh.try_reserve_exact(meshes.len())?;

    let mut offset = 0;
    for mesh in meshes {
        per_mesh.push(build_mesh_commands(mesh, offset));
        offset += mesh.vertices.len();
    }

    let total: usize = per_mesh
        .iter()
        .map(|cmds| cmds.iter().map(GlCommand::word_count).sum::<usize>() + 1)
        .sum();
    let mut words = Vec::new();
    words.try_reserve_exact(total)?;
    for commands in &per_mesh {
        for command in commands {
            command.encode_into(&mut words);
        }
        words.push(0);
    }

    let strips = per_mesh
        .iter()
        .flatten()
        .filter(|c| c.primitive == GlPrimitive::Strip)
        .count();
    tracing::debug!(
        "Built {} draw commands ({} strips), {} words",
        per_mesh.iter().map(Vec::len).sum::<usize>(),
        strips,
        words.len()
    );
    Ok(words)
}
