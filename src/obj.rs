//! Wavefront OBJ loading.
//!
//! Parsing is delegated to `tobj` (quads and larger polygons are fanned
//! into triangles, position/texcoord/normal indices stay independent);
//! this module folds every model in the file into a single [`Mesh`] and
//! upholds the loader side of the mesh contract: indices validated, and
//! per-vertex normals synthesized when the file carries none.

use std::path::Path;

use tracing::{info, warn};

use crate::math::{Vec2, Vec3};
use crate::mesh::{Mesh, MeshError, VertexRef};

/// Loads an OBJ file into a single merged mesh.
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, MeshError> {
    let (models, _materials) = tobj::load_obj(
        path.as_ref(),
        &tobj::LoadOptions {
            triangulate: true,
            single_index: false,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        },
    )?;

    let mut mesh = Mesh::default();
    let mut all_have_normals = true;

    for model in &models {
        let m = &model.mesh;

        let pos_base = mesh.positions.len();
        let tex_base = mesh.texcoords.len();
        let normal_base = mesh.normals.len();

        mesh.positions.extend(
            m.positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2])),
        );
        mesh.texcoords
            .extend(m.texcoords.chunks_exact(2).map(|t| Vec2::new(t[0], t[1])));
        mesh.normals.extend(
            m.normals
                .chunks_exact(3)
                .map(|n| Vec3::new(n[0], n[1], n[2])),
        );

        let has_texcoords = !m.texcoord_indices.is_empty();
        let has_normals = !m.normal_indices.is_empty();
        all_have_normals &= has_normals;

        for t in 0..m.indices.len() / 3 {
            let mut face = [VertexRef {
                pos: 0,
                tex: 0,
                normal: 0,
            }; 3];
            for (k, v) in face.iter_mut().enumerate() {
                let i = 3 * t + k;
                let pos = pos_base + m.indices[i] as usize;
                v.pos = pos;
                // Absent streams alias the position index, matching the
                // mesh contract for files without vt/vn directives.
                v.tex = if has_texcoords {
                    tex_base + m.texcoord_indices[i] as usize
                } else {
                    pos
                };
                v.normal = if has_normals {
                    normal_base + m.normal_indices[i] as usize
                } else {
                    pos
                };
            }
            mesh.faces.push(face);
        }
    }

    if !all_have_normals {
        // Mixed meshes would leave aliased indices pointing into a
        // foreign normal array, so regenerate for the whole mesh.
        warn!("model carries no (or partial) normals, synthesizing per-vertex normals");
        mesh.generate_normals();
    }

    mesh.validate()?;

    info!(
        vertices = mesh.positions.len(),
        normals = mesh.normals.len(),
        triangles = mesh.faces.len(),
        generated_normals = !all_have_normals,
        "loaded OBJ model"
    );

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    fn write_obj(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".obj")
            .tempfile()
            .expect("create temp obj");
        file.write_all(content.as_bytes()).expect("write temp obj");
        file
    }

    #[test]
    fn loads_positions_normals_and_faces() {
        let file = write_obj(
            "v 0 0 0\n\
             v 1 0 0\n\
             v 0 1 0\n\
             vn 0 0 1\n\
             f 1//1 2//1 3//1\n",
        );
        let mesh = load_obj(file.path()).expect("load");

        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.normals.len(), 1);
        assert_eq!(mesh.faces.len(), 1);
        let face = mesh.faces[0];
        assert_eq!([face[0].pos, face[1].pos, face[2].pos], [0, 1, 2]);
        assert_eq!(face[0].normal, 0);
        assert_relative_eq!(mesh.normals[0], Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn quad_faces_fan_into_two_triangles() {
        let file = write_obj(
            "v 0 0 0\n\
             v 1 0 0\n\
             v 1 1 0\n\
             v 0 1 0\n\
             f 1 2 3 4\n",
        );
        let mesh = load_obj(file.path()).expect("load");

        assert_eq!(mesh.faces.len(), 2);
        let a = mesh.faces[0].map(|v| v.pos);
        let b = mesh.faces[1].map(|v| v.pos);
        assert_eq!(a, [0, 1, 2]);
        assert_eq!(b, [0, 2, 3]);
    }

    #[test]
    fn missing_normals_are_synthesized_and_aliased() {
        let file = write_obj(
            "v 0 0 0\n\
             v 1 0 0\n\
             v 0 1 0\n\
             f 1 2 3\n",
        );
        let mesh = load_obj(file.path()).expect("load");

        assert_eq!(mesh.normals.len(), mesh.positions.len());
        for face in &mesh.faces {
            for v in face {
                assert_eq!(v.normal, v.pos);
            }
        }
        for n in &mesh.normals {
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-6);
        }
    }
}
