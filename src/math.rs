//! Math primitives used throughout the pipeline.
//!
//! All pipeline math is single-precision and built on nalgebra's fixed-size
//! vector and matrix types; this module pins down the aliases and the few
//! operations nalgebra does not provide in the exact form the renderer needs.

pub type Vec2 = nalgebra::Vector2<f32>;
pub type Vec3 = nalgebra::Vector3<f32>;
pub type Vec4 = nalgebra::Vector4<f32>;
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Pivot threshold below which a matrix is treated as singular.
pub const EPS: f32 = 1e-6;

/// Inverts a matrix by Gaussian elimination with partial pivoting.
///
/// Returns the zero matrix when a pivot magnitude falls below [`EPS`],
/// so a singular model matrix degrades to a zeroed normal transform for
/// one frame instead of poisoning the pipeline with NaNs.
pub fn inverse_or_zero(m: &Mat4) -> Mat4 {
    let mut a = *m;
    let mut inv = Mat4::identity();

    // Forward elimination
    for i in 0..3 {
        let mut pivot = i;
        let mut pivot_size = a[(i, i)].abs();
        for j in i + 1..4 {
            let tmp = a[(j, i)].abs();
            if tmp > pivot_size {
                pivot = j;
                pivot_size = tmp;
            }
        }

        if pivot_size < EPS {
            return Mat4::zeros();
        }

        if pivot != i {
            a.swap_rows(i, pivot);
            inv.swap_rows(i, pivot);
        }

        for j in i + 1..4 {
            let f = a[(j, i)] / a[(i, i)];
            for k in 0..4 {
                let t = a[(i, k)];
                a[(j, k)] -= t * f;
                let t = inv[(i, k)];
                inv[(j, k)] -= t * f;
            }
        }
    }

    // Back substitution
    for i in (0..4).rev() {
        let f = a[(i, i)];
        if f == 0.0 {
            return Mat4::zeros();
        }
        for j in 0..4 {
            a[(i, j)] /= f;
            inv[(i, j)] /= f;
        }
        for j in 0..i {
            let f = a[(j, i)];
            for k in 0..4 {
                let t = a[(i, k)];
                a[(j, k)] -= f * t;
                let t = inv[(i, k)];
                inv[(j, k)] -= f * t;
            }
        }
    }

    inv
}

/// Componentwise remap of `v` from the source range `[sl, sr]` to the
/// target range `[tl, tr]`, saturating outside the source range.
pub fn remap_clamped(v: Vec3, sl: f32, sr: f32, tl: f32, tr: f32) -> Vec3 {
    v.map(|c| {
        if c > sr {
            tr
        } else if c < sl {
            tl
        } else {
            (c - sl) / (sr - sl) * (tr - tl) + tl
        }
    })
}

/// Rotates `v` around the unit axis `k` by `theta` radians using Rodrigues'
/// formula, then re-normalizes.
///
/// Callers only ever rotate unit orientation vectors, so the normalization
/// absorbs the floating-point drift that accumulates across frames.
pub fn rodrigues(k: &Vec3, v: &Vec3, theta: f32) -> Vec3 {
    let (sin, cos) = theta.sin_cos();
    (v * cos + k.cross(v) * sin + k * (k.dot(v) * (1.0 - cos))).normalize()
}
