//! Half-space triangle rasterization and the staged fragment path.
//!
//! Rasterizing workers never touch the shared depth buffer directly.
//! Each worker stages fragments into a local batch and merges it into
//! the `(depth, fragments)` pair under one global mutex, so lock
//! contention scales with the triangle count divided by the batch size
//! instead of with the pixel count.

use parking_lot::Mutex;

use crate::math::Vec3;
use crate::surface::Surface;

use super::geometry::{Fragment, Triangle};
use super::line;

/// Staged fragments per worker before one locked merge.
pub const MAX_BATCH: usize = 4096;

/// Gray level written by the wireframe path.
pub const FRAME_GRAY: f32 = 0.5;

/// The shared merge target: the global depth buffer and the list of
/// fragments that have won their depth test so far.
pub struct FragmentSink<'a> {
    pub depth: &'a mut [f32],
    pub fragments: &'a mut Vec<Fragment>,
}

/// Worker-local fragment accumulator.
///
/// Dropping the batch flushes whatever is still staged, so a worker
/// finishing its triangle range cannot lose fragments.
pub struct FragmentBatch<'a, 'b> {
    sink: &'a Mutex<FragmentSink<'b>>,
    staged: Vec<Fragment>,
}

impl<'a, 'b> FragmentBatch<'a, 'b> {
    pub fn new(sink: &'a Mutex<FragmentSink<'b>>) -> FragmentBatch<'a, 'b> {
        FragmentBatch {
            sink,
            // Reserve twice the batch size so pushes never reallocate.
            staged: Vec::with_capacity(2 * MAX_BATCH),
        }
    }

    pub fn push(&mut self, fragment: Fragment) {
        self.staged.push(fragment);
        if self.staged.len() >= MAX_BATCH {
            self.transfer();
        }
    }

    /// Merges the staged fragments into the global depth buffer under
    /// the sink mutex. Fragments losing the `>` depth test are dropped
    /// here (early Z); winners update the depth buffer and join the
    /// global fragment list.
    pub fn transfer(&mut self) {
        let sink = &mut *self.sink.lock();
        for f in self.staged.drain(..) {
            if f.depth > sink.depth[f.pid] {
                sink.depth[f.pid] = f.depth;
                sink.fragments.push(f);
            }
        }
    }
}

impl Drop for FragmentBatch<'_, '_> {
    fn drop(&mut self) {
        if !self.staged.is_empty() {
            self.transfer();
        }
    }
}

/// Perspective divide on `x`/`y` only (`w` keeps the view-space Z),
/// followed by the viewport transform into screen coordinates.
pub fn project_to_screen(t: &mut Triangle, width: usize, height: usize) {
    for v in t.iter_mut() {
        v.c_pos.x /= v.c_pos.w;
        v.c_pos.y /= v.c_pos.w;
        v.c_pos.x = 0.5 * width as f32 * (v.c_pos.x + 1.0);
        v.c_pos.y = 0.5 * height as f32 * (v.c_pos.y + 1.0);
    }
}

/// Signed doubled area of the screen-space triangle. Negative for back
/// faces, zero for degenerate ones.
pub fn signed_area(t: &Triangle) -> f32 {
    (t[0].c_pos.x - t[1].c_pos.x) * (t[1].c_pos.y - t[2].c_pos.y)
        - (t[1].c_pos.x - t[2].c_pos.x) * (t[0].c_pos.y - t[1].c_pos.y)
}

/// Rasterizes one screen-space triangle into the staging batch.
///
/// The caller has already handled culling and degenerate areas.
pub fn rasterize_triangle(
    t: &Triangle,
    area: f32,
    width: usize,
    height: usize,
    batch: &mut FragmentBatch,
) {
    let xs = [t[0].c_pos.x, t[1].c_pos.x, t[2].c_pos.x];
    let ys = [t[0].c_pos.y, t[1].c_pos.y, t[2].c_pos.y];

    let lbound = xs[0].min(xs[1]).min(xs[2]).clamp(0.0, (width - 1) as f32) as i32;
    let rbound = xs[0].max(xs[1]).max(xs[2]).clamp(0.0, (width - 1) as f32) as i32;
    let bbound = ys[0].min(ys[1]).min(ys[2]).clamp(0.0, (height - 1) as f32) as i32;
    let tbound = ys[0].max(ys[1]).max(ys[2]).clamp(0.0, (height - 1) as f32) as i32;

    // A back face kept alive by disabled culling flips the sign of all
    // three edge functions; testing against the sign of the area keeps
    // its interior rasterizable while the S/area ratios stay positive.
    let sign = if area < 0.0 { -1.0 } else { 1.0 };

    let (w0, w1, w2) = (t[0].c_pos.w, t[1].c_pos.w, t[2].c_pos.w);

    for y in bbound..=tbound {
        let mut met = false;
        for x in lbound..=rbound {
            let mut inside = true;
            let mut s = [0.0f32; 3];
            for i in 0..3 {
                let j = (i + 1) % 3;
                s[i] = (t[j].c_pos.x - t[i].c_pos.x) * (y as f32 - t[i].c_pos.y)
                    - (t[j].c_pos.y - t[i].c_pos.y) * (x as f32 - t[i].c_pos.x);
                if s[i] * sign < 0.0 {
                    inside = false;
                    break;
                }
            }

            if !inside {
                if met {
                    break; // the row has left the triangle; convexity
                }
                continue;
            }
            met = true;

            let pid = y as usize * width + x as usize;

            // Perspective-correct interpolation against the view-space
            // depths stored in w.
            let alpha = s[1] / area;
            let beta = s[2] / area;
            let gamma = s[0] / area;
            let z = 1.0 / (alpha / w0 + beta / w1 + gamma / w2);

            let interpolate = |a0: &Vec3, a1: &Vec3, a2: &Vec3| -> Vec3 {
                (a0 * (alpha / w0) + a1 * (beta / w1) + a2 * (gamma / w2)) * z
            };
            let w_pos = interpolate(&t[0].w_pos, &t[1].w_pos, &t[2].w_pos);
            let w_normal = interpolate(&t[0].w_normal, &t[1].w_normal, &t[2].w_normal);

            batch.push(Fragment {
                pid,
                depth: z,
                w_pos,
                w_normal,
            });
        }
    }
}

/// Wireframe path: clips each edge to the screen rectangle and draws it
/// with Bresenham in a fixed mid-gray. No depth test, no fragments.
pub fn draw_wireframe<S: Surface>(surface: &S, t: &Triangle) {
    let color = Vec3::repeat(FRAME_GRAY);
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (a, b) = (t[i].c_pos, t[j].c_pos);
        if let Some(((x0, y0), (x1, y1))) =
            line::cohen_sutherland(a.x, a.y, b.x, b.y, surface.width(), surface.height())
        {
            line::bresenham(
                surface,
                (x0 as i32, y0 as i32),
                (x1 as i32, y1 as i32),
                color,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec4;
    use crate::render::geometry::Vertex;
    use approx::assert_relative_eq;

    const W: usize = 40;
    const H: usize = 40;

    /// A vertex already in screen space with the given view-space depth.
    fn screen_vertex(x: f32, y: f32, view_z: f32, w_pos: Vec3) -> Vertex {
        Vertex {
            w_pos,
            c_pos: Vec4::new(x, y, 0.0, view_z),
            w_normal: Vec3::new(0.0, 0.0, 1.0),
        }
    }

    fn rasterize(t: &Triangle) -> (Vec<f32>, Vec<Fragment>) {
        let mut depth = vec![super::super::DEPTH_CLEAR; W * H];
        let mut fragments = Vec::new();
        {
            let sink = Mutex::new(FragmentSink {
                depth: &mut depth,
                fragments: &mut fragments,
            });
            let mut batch = FragmentBatch::new(&sink);
            let area = signed_area(t);
            assert!(area != 0.0);
            rasterize_triangle(t, area, W, H, &mut batch);
        }
        (depth, fragments)
    }

    #[test]
    fn coverage_matches_the_half_space_test() {
        let t = [
            screen_vertex(2.0, 2.0, -1.0, Vec3::zeros()),
            screen_vertex(30.0, 5.0, -1.0, Vec3::zeros()),
            screen_vertex(10.0, 25.0, -1.0, Vec3::zeros()),
        ];
        let (_, fragments) = rasterize(&t);
        assert!(!fragments.is_empty());

        // Brute-force the three edge functions for every pixel.
        let mut expected = Vec::new();
        for y in 0..H as i32 {
            for x in 0..W as i32 {
                let mut inside = true;
                for i in 0..3 {
                    let j = (i + 1) % 3;
                    let s = (t[j].c_pos.x - t[i].c_pos.x) * (y as f32 - t[i].c_pos.y)
                        - (t[j].c_pos.y - t[i].c_pos.y) * (x as f32 - t[i].c_pos.x);
                    if s < 0.0 {
                        inside = false;
                    }
                }
                if inside {
                    expected.push(y as usize * W + x as usize);
                }
            }
        }

        let mut got: Vec<usize> = fragments.iter().map(|f| f.pid).collect();
        got.sort_unstable();
        assert_eq!(got, expected);
    }

    #[test]
    fn barycentric_weights_sum_to_one() {
        let t = [
            screen_vertex(0.0, 0.0, -1.0, Vec3::zeros()),
            screen_vertex(30.0, 0.0, -2.0, Vec3::zeros()),
            screen_vertex(0.0, 30.0, -4.0, Vec3::zeros()),
        ];
        let area = signed_area(&t);
        let (_, fragments) = rasterize(&t);

        for f in &fragments {
            let (x, y) = ((f.pid % W) as f32, (f.pid / W) as f32);
            let mut s = [0.0f32; 3];
            for i in 0..3 {
                let j = (i + 1) % 3;
                s[i] = (t[j].c_pos.x - t[i].c_pos.x) * (y - t[i].c_pos.y)
                    - (t[j].c_pos.y - t[i].c_pos.y) * (x - t[i].c_pos.x);
            }
            let sum = (s[0] + s[1] + s[2]) / area;
            assert!((sum - 1.0).abs() < 1e-4, "weights sum to {sum}");
        }
    }

    #[test]
    fn equal_depth_interpolation_is_affine() {
        // With equal vertex depths the perspective correction cancels:
        // the attribute at the screen-space centroid equals the centroid
        // of the attributes.
        let t = [
            screen_vertex(0.0, 0.0, -2.0, Vec3::new(0.0, 0.0, 0.0)),
            screen_vertex(30.0, 0.0, -2.0, Vec3::new(3.0, 0.0, 0.0)),
            screen_vertex(0.0, 30.0, -2.0, Vec3::new(0.0, 3.0, 0.0)),
        ];
        let (_, fragments) = rasterize(&t);

        let centroid_pid = 10 * W + 10; // exact centroid of (0,0),(30,0),(0,30)
        let f = fragments
            .iter()
            .find(|f| f.pid == centroid_pid)
            .expect("centroid pixel rasterized");
        assert_relative_eq!(f.w_pos, Vec3::new(1.0, 1.0, 0.0), epsilon = 1e-4);
        assert_relative_eq!(f.depth, -2.0, epsilon = 1e-5);
    }

    #[test]
    fn back_face_interior_rasterizes_when_kept() {
        // Clockwise winding: negative area. With culling disabled the
        // caller still rasterizes it; coverage must match the
        // counter-clockwise twin.
        let ccw = [
            screen_vertex(2.0, 2.0, -1.0, Vec3::zeros()),
            screen_vertex(30.0, 5.0, -1.0, Vec3::zeros()),
            screen_vertex(10.0, 25.0, -1.0, Vec3::zeros()),
        ];
        let cw = [ccw[0], ccw[2], ccw[1]];
        assert!(signed_area(&cw) < 0.0);

        let (_, frags_ccw) = rasterize(&ccw);
        let (_, frags_cw) = rasterize(&cw);

        let mut a: Vec<usize> = frags_ccw.iter().map(|f| f.pid).collect();
        let mut b: Vec<usize> = frags_cw.iter().map(|f| f.pid).collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn transfer_keeps_the_closest_fragment() {
        let mut depth = vec![super::super::DEPTH_CLEAR; W * H];
        let mut fragments = Vec::new();

        let fragment = |depth: f32| Fragment {
            pid: 7,
            depth,
            w_pos: Vec3::zeros(),
            w_normal: Vec3::zeros(),
        };

        {
            let sink = Mutex::new(FragmentSink {
                depth: &mut depth,
                fragments: &mut fragments,
            });
            let mut batch = FragmentBatch::new(&sink);
            batch.push(fragment(-3.0));
            batch.transfer();
            batch.push(fragment(-2.0)); // closer, wins
            batch.transfer();
            batch.push(fragment(-2.5)); // farther, early-Z rejected at merge
        } // residue flushes when the batch drops

        assert_eq!(depth[7], -2.0);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments.last().unwrap().depth, -2.0);
    }
}
