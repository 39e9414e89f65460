//! Pipeline-internal geometry carried between stages.

use crate::math::{Vec3, Vec4};

/// A vertex in flight through the pipeline.
///
/// `c_pos.w` always holds the pre-projection view-space Z (the projection
/// matrix is built so clip `w` equals view Z); it is the depth key and
/// the denominator for perspective-correct interpolation. After the
/// perspective divide the `x`/`y` components are reused in place for
/// screen coordinates, `w` stays untouched.
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    /// World-space position.
    pub w_pos: Vec3,
    /// Clip-space position, later screen-space in `x`/`y`.
    pub c_pos: Vec4,
    /// World-space normal (not normalized; scaled by the normal matrix).
    pub w_normal: Vec3,
}

/// Three pipeline vertices.
pub type Triangle = [Vertex; 3];

/// A candidate pixel produced by the rasterizer.
///
/// `depth` is the perspective-correct view-space Z at the pixel; larger
/// (less negative) means closer to the camera.
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    /// Row-major pixel index into the color and depth buffers.
    pub pid: usize,
    pub depth: f32,
    pub w_pos: Vec3,
    pub w_normal: Vec3,
}
