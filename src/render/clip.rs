//! Near-plane triangle clipping.
//!
//! Triangles are clipped in view space against the plane `z = z_near`
//! using the view-space Z preserved in `c_pos.w`. A vertex counts as out
//! when `c_pos.w >= z_near`; since `z_near` is negative that means "on
//! the camera side of the plane", which is the convention the rest of
//! the pipeline is built around.

use smallvec::SmallVec;

use super::geometry::{Triangle, Vertex};

/// Clips one triangle against the near plane.
///
/// Returns zero triangles (fully discarded), the unchanged input, or the
/// fan retriangulation of the clipped 3- or 4-vertex polygon.
pub fn clip_near(t: &Triangle, z_near: f32) -> SmallVec<[Triangle; 2]> {
    let out = [
        t[0].c_pos.w >= z_near,
        t[1].c_pos.w >= z_near,
        t[2].c_pos.w >= z_near,
    ];

    if out[0] && out[1] && out[2] {
        return SmallVec::new();
    }
    if !out[0] && !out[1] && !out[2] {
        let mut passthrough = SmallVec::new();
        passthrough.push(*t);
        return passthrough;
    }

    // Walk the edges cyclically, emitting the plane intersection on each
    // crossing edge and every endpoint on the far side of the plane.
    let mut polygon: SmallVec<[Vertex; 4]> = SmallVec::new();
    for i in 0..3 {
        let j = (i + 1) % 3;
        let da = z_near - t[i].c_pos.w;
        let db = z_near - t[j].c_pos.w;

        if da * db < 0.0 {
            let alpha = da / (da - db);
            polygon.push(lerp_vertex(&t[i], &t[j], alpha));
        }
        if db > 0.0 {
            polygon.push(t[j]);
        }
    }

    let mut triangles = SmallVec::new();
    for i in 2..polygon.len() {
        triangles.push([polygon[0], polygon[i - 1], polygon[i]]);
    }
    triangles
}

/// All three attributes interpolate with the same factor.
fn lerp_vertex(a: &Vertex, b: &Vertex, alpha: f32) -> Vertex {
    Vertex {
        w_pos: a.w_pos * (1.0 - alpha) + b.w_pos * alpha,
        c_pos: a.c_pos * (1.0 - alpha) + b.c_pos * alpha,
        w_normal: a.w_normal * (1.0 - alpha) + b.w_normal * alpha,
    }
}
