//! Triangulated mesh data as delivered by the loader.

use thiserror::Error;

use crate::math::{Vec2, Vec3};

/// One corner of a face: indices into the position, texture-coordinate,
/// and normal arrays of the owning [`Mesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexRef {
    pub pos: usize,
    pub tex: usize,
    pub normal: usize,
}

/// A triangle as three vertex references.
pub type Face = [VertexRef; 3];

/// Indexed triangle mesh. Immutable for the duration of a frame.
///
/// The renderer assumes every index is in range; [`Mesh::validate`] is the
/// loader's tool to uphold that contract before the mesh reaches the
/// pipeline.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub faces: Vec<Face>,
}

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("failed to read OBJ data: {0}")]
    Load(#[from] tobj::LoadError),
    #[error("face {face} references out-of-range {kind} index {index} (have {limit})")]
    IndexOutOfRange {
        face: usize,
        kind: &'static str,
        index: usize,
        limit: usize,
    },
}

impl Mesh {
    /// Checks that every face index is within the bounds of its array.
    ///
    /// Texture-coordinate indices are exempt when the mesh carries no
    /// texture coordinates at all; the loader leaves them aliased to the
    /// position index in that case and the pipeline never reads them.
    pub fn validate(&self) -> Result<(), MeshError> {
        for (i, face) in self.faces.iter().enumerate() {
            for v in face {
                if v.pos >= self.positions.len() {
                    return Err(MeshError::IndexOutOfRange {
                        face: i,
                        kind: "position",
                        index: v.pos,
                        limit: self.positions.len(),
                    });
                }
                if v.normal >= self.normals.len() {
                    return Err(MeshError::IndexOutOfRange {
                        face: i,
                        kind: "normal",
                        index: v.normal,
                        limit: self.normals.len(),
                    });
                }
                if !self.texcoords.is_empty() && v.tex >= self.texcoords.len() {
                    return Err(MeshError::IndexOutOfRange {
                        face: i,
                        kind: "texcoord",
                        index: v.tex,
                        limit: self.texcoords.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Synthesizes area-weighted per-vertex normals.
    ///
    /// Each face contributes its unnormalized face normal
    /// `(p0 - p1) x (p1 - p2)`, whose magnitude is proportional to the
    /// face area, to all three of its vertices; the sums are then
    /// normalized. Face normal indices are re-aliased to the position
    /// indices, since the synthesized array is parallel to `positions`.
    pub fn generate_normals(&mut self) {
        let mut accumulated = vec![Vec3::zeros(); self.positions.len()];

        for face in &mut self.faces {
            let p0 = self.positions[face[0].pos];
            let p1 = self.positions[face[1].pos];
            let p2 = self.positions[face[2].pos];
            let face_normal = (p0 - p1).cross(&(p1 - p2));

            for v in face {
                v.normal = v.pos;
                accumulated[v.pos] += face_normal;
            }
        }

        self.normals = accumulated
            .into_iter()
            .map(|n| {
                if n.norm_squared() > 0.0 {
                    n.normalize()
                } else {
                    n // vertex with no incident faces (or degenerate ones)
                }
            })
            .collect();
    }
}
