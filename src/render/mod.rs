//! The rendering pipeline driver.
//!
//! One [`Renderer::draw`] call runs the whole per-frame sequence:
//! matrix update, parallel clear, parallel vertex transform, parallel
//! triangle assembly + near clip + rasterization, and the parallel
//! fragment shading pass. Stages are separated by the worker pool's
//! barrier; within a stage, work is split into contiguous ranges and no
//! cross-worker ordering is assumed.

pub mod clip;
pub mod geometry;
pub mod line;
pub mod raster;
pub mod shading;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::math::{inverse_or_zero, Mat4, Vec3, Vec4};
use crate::mesh::Mesh;
use crate::object::{Camera, Light, Model};
use crate::pool::WorkerPool;
use crate::surface::Surface;

use self::geometry::{Fragment, Triangle, Vertex};
use self::raster::{FragmentBatch, FragmentSink};

/// Depth buffer clear value. The depth test is `>` and any fragment in
/// front of the camera carries a view-space Z far above this.
pub const DEPTH_CLEAR: f32 = -1e8;

/// Per-frame shading mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Blinn-Phong lighting.
    PhongShading,
    /// View-space depth rendered as gray.
    ZColoring,
    /// Wireframe edges only.
    Framework,
}

/// Size of the contiguous ranges a stage's work is split into.
fn block_size(items: usize, threads: usize) -> usize {
    (items / (8 * threads)).clamp(32, 512)
}

/// The pipeline driver. Owns the worker pool and every per-frame buffer;
/// buffers are cleared between frames, never reallocated.
pub struct Renderer {
    pool: WorkerPool,
    num_threads: usize,
    pub backface_culling: bool,
    pub bg_color: Vec3,

    // vertex stage outputs, indexed like the mesh arrays
    w_pos: Vec<Vec3>,
    c_pos: Vec<Vec4>,
    w_normal: Vec<Vec3>,

    // fragment stage inputs
    depth: Vec<f32>,
    fragments: Vec<Fragment>,
}

impl Renderer {
    pub fn new(num_threads: usize, backface_culling: bool, bg_color: Vec3) -> Renderer {
        debug!(num_threads, "starting renderer worker pool");
        Renderer {
            pool: WorkerPool::new(num_threads),
            num_threads,
            backface_culling,
            bg_color,
            w_pos: Vec::new(),
            c_pos: Vec::new(),
            w_normal: Vec::new(),
            depth: Vec::new(),
            fragments: Vec::new(),
        }
    }

    /// View-space depth per pixel as left by the last frame.
    pub fn depth_buffer(&self) -> &[f32] {
        &self.depth
    }

    /// Renders one frame of `model` into `surface`.
    pub fn draw<S: Surface>(
        &mut self,
        surface: &S,
        camera: &Camera,
        model: &Model,
        lights: &[Light],
        ambient_light: Vec3,
        mode: Mode,
    ) {
        self.depth
            .resize(surface.width() * surface.height(), DEPTH_CLEAR);

        // 1. matrices, once per frame
        let m = model.matrix_m();
        let inv_trans_m = inverse_or_zero(&m).transpose();
        let pv = camera.matrix_p() * camera.matrix_v();

        // 2..5 parallel stages, one barrier each
        self.clear(surface);
        self.process_vertices(&model.mesh, &m, &pv, &inv_trans_m);
        self.process_triangles(surface, &model.mesh, camera.z_near, mode);
        trace!(fragments = self.fragments.len(), "frame rasterized");
        self.process_fragments(surface, camera, model, lights, ambient_light, mode);
    }

    /// Resets every pixel to the background color and every depth to
    /// [`DEPTH_CLEAR`], partitioned into row ranges across workers.
    fn clear<S: Surface>(&mut self, surface: &S) {
        let Renderer {
            pool,
            depth,
            fragments,
            num_threads,
            bg_color,
            ..
        } = self;
        let width = surface.width();
        let bg = *bg_color;

        fragments.clear();

        let rows = block_size(surface.height(), *num_threads);
        pool.scoped(|scope| {
            for (block, depth_rows) in depth.chunks_mut(rows * width).enumerate() {
                let base = block * rows * width;
                scope.execute(move || {
                    for (i, d) in depth_rows.iter_mut().enumerate() {
                        surface.draw_pixel(base + i, bg);
                        *d = DEPTH_CLEAR;
                    }
                });
            }
        });
    }

    /// Transforms positions into world and clip space and normals into
    /// world space, in parallel over independent ranges.
    fn process_vertices(&mut self, mesh: &Mesh, m: &Mat4, pv: &Mat4, inv_trans_m: &Mat4) {
        let Renderer {
            pool,
            w_pos,
            c_pos,
            w_normal,
            num_threads,
            ..
        } = self;
        w_pos.resize(mesh.positions.len(), Vec3::zeros());
        c_pos.resize(mesh.positions.len(), Vec4::zeros());
        w_normal.resize(mesh.normals.len(), Vec3::zeros());

        let bs_pos = block_size(mesh.positions.len(), *num_threads);
        let bs_normal = block_size(mesh.normals.len(), *num_threads);

        pool.scoped(|scope| {
            for ((block, w_chunk), c_chunk) in w_pos
                .chunks_mut(bs_pos)
                .enumerate()
                .zip(c_pos.chunks_mut(bs_pos))
            {
                let positions = &mesh.positions[block * bs_pos..];
                scope.execute(move || {
                    for ((w, c), p) in w_chunk.iter_mut().zip(c_chunk).zip(positions) {
                        let pos = m * Vec4::new(p.x, p.y, p.z, 1.0);
                        *w = pos.xyz();
                        *c = pv * pos;
                    }
                });
            }

            for (block, n_chunk) in w_normal.chunks_mut(bs_normal).enumerate() {
                let normals = &mesh.normals[block * bs_normal..];
                scope.execute(move || {
                    for (out, n) in n_chunk.iter_mut().zip(normals) {
                        *out = (inv_trans_m * Vec4::new(n.x, n.y, n.z, 0.0)).xyz();
                    }
                });
            }
        });
    }

    /// Assembles, clips, and rasterizes triangles in parallel over face
    /// ranges. Fill modes stage fragments through per-worker batches;
    /// wireframe draws edges straight to the surface.
    fn process_triangles<S: Surface>(
        &mut self,
        surface: &S,
        mesh: &Mesh,
        z_near: f32,
        mode: Mode,
    ) {
        let Renderer {
            pool,
            w_pos,
            c_pos,
            w_normal,
            depth,
            fragments,
            num_threads,
            backface_culling,
            ..
        } = self;
        let (w_pos, c_pos, w_normal) = (w_pos.as_slice(), c_pos.as_slice(), w_normal.as_slice());
        let (width, height) = (surface.width(), surface.height());
        let culling = *backface_culling;

        let sink = Mutex::new(FragmentSink {
            depth: depth.as_mut_slice(),
            fragments,
        });

        let bs = block_size(mesh.faces.len(), *num_threads);
        pool.scoped(|scope| {
            for faces in mesh.faces.chunks(bs) {
                let sink = &sink;
                scope.execute(move || {
                    let mut batch = FragmentBatch::new(sink);
                    for face in faces {
                        let triangle: Triangle = face.map(|v| Vertex {
                            w_pos: w_pos[v.pos],
                            c_pos: c_pos[v.pos],
                            w_normal: w_normal[v.normal],
                        });

                        for mut t in clip::clip_near(&triangle, z_near) {
                            raster::project_to_screen(&mut t, width, height);

                            match mode {
                                Mode::Framework => raster::draw_wireframe(surface, &t),
                                Mode::PhongShading | Mode::ZColoring => {
                                    let area = raster::signed_area(&t);
                                    if culling && area < 0.0 {
                                        continue; // back face
                                    }
                                    if area == 0.0 {
                                        continue; // degenerate
                                    }
                                    raster::rasterize_triangle(&t, area, width, height, &mut batch);
                                }
                            }
                        }
                    }
                    // residual fragments flush when the batch drops
                });
            }
        });
    }

    /// Shades every fragment that still owns its pixel. The shading mode
    /// is dispatched once out here, not per pixel.
    fn process_fragments<S: Surface>(
        &mut self,
        surface: &S,
        camera: &Camera,
        model: &Model,
        lights: &[Light],
        ambient_light: Vec3,
        mode: Mode,
    ) {
        let Renderer {
            pool,
            depth,
            fragments,
            num_threads,
            ..
        } = self;
        let depth = depth.as_slice();
        let fragments = fragments.as_slice();
        let bs = block_size(fragments.len(), *num_threads);

        match mode {
            // Wireframe never reaches the fragment stage.
            Mode::Framework => {}
            Mode::PhongShading => {
                let shader =
                    shading::PhongShader::new(&model.material, camera.pose.w_pos, lights, ambient_light);
                let shader = &shader;
                pool.scoped(|scope| {
                    for chunk in fragments.chunks(bs) {
                        scope.execute(move || {
                            for f in chunk {
                                // Only the fragment whose depth survived the
                                // merge may color its pixel. Both floats come
                                // from the same write, so `==` is exact.
                                if f.depth == depth[f.pid] {
                                    surface.draw_pixel(f.pid, shader.run(f));
                                }
                            }
                        });
                    }
                });
            }
            Mode::ZColoring => {
                pool.scoped(|scope| {
                    for chunk in fragments.chunks(bs) {
                        scope.execute(move || {
                            for f in chunk {
                                if f.depth == depth[f.pid] {
                                    surface.draw_pixel(f.pid, shading::depth_color(depth[f.pid]));
                                }
                            }
                        });
                    }
                });
            }
        }
    }
}
