//! Multi-threaded CPU rasterizer with a terminal display.
//!
//! The pipeline transforms an OBJ mesh through model, world, clip, and
//! screen space, clips against the near plane, rasterizes with half-space
//! tests and perspective-correct interpolation, depth-tests through
//! per-worker staged batches, and shades fragments with Blinn-Phong
//! lighting (or depth/wireframe visualization). Every stage runs on a
//! fixed worker pool; the terminal canvas downsamples the pixel buffer
//! into a colored character grid.

pub mod canvas;
pub mod math;
pub mod mesh;
pub mod obj;
pub mod object;
pub mod pool;
pub mod render;
pub mod surface;
