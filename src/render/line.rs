//! Screen-space line primitives for wireframe rendering.

use crate::math::Vec3;
use crate::surface::Surface;

const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const BOTTOM: u8 = 4;
const TOP: u8 = 8;

/// Cohen-Sutherland clip of a segment against `[0, w-1] x [0, h-1]`.
///
/// Returns the clipped endpoints, or `None` when the segment lies fully
/// outside the screen rectangle.
pub fn cohen_sutherland(
    mut x0: f32,
    mut y0: f32,
    mut x1: f32,
    mut y1: f32,
    width: usize,
    height: usize,
) -> Option<((f32, f32), (f32, f32))> {
    let xmax = width as f32 - 1.0;
    let ymax = height as f32 - 1.0;

    let encode = |x: f32, y: f32| -> u8 {
        let mut code = 0;
        if x < 0.0 {
            code |= LEFT;
        } else if x > xmax {
            code |= RIGHT;
        }
        if y < 0.0 {
            code |= BOTTOM;
        } else if y > ymax {
            code |= TOP;
        }
        code
    };

    let mut code0 = encode(x0, y0);
    let mut code1 = encode(x1, y1);

    loop {
        if code0 | code1 == 0 {
            return Some(((x0, y0), (x1, y1)));
        }
        if code0 & code1 != 0 {
            return None;
        }

        let code = code0.max(code1);
        let (x, y) = if code & TOP != 0 {
            (x0 + (x1 - x0) * (ymax - y0) / (y1 - y0), ymax)
        } else if code & BOTTOM != 0 {
            (x0 + (x1 - x0) * (0.0 - y0) / (y1 - y0), 0.0)
        } else if code & RIGHT != 0 {
            (xmax, y0 + (y1 - y0) * (xmax - x0) / (x1 - x0))
        } else {
            (0.0, y0 + (y1 - y0) * (0.0 - x0) / (x1 - x0))
        };

        if code == code0 {
            x0 = x;
            y0 = y;
            code0 = encode(x0, y0);
        } else {
            x1 = x;
            y1 = y;
            code1 = encode(x1, y1);
        }
    }
}

/// Bresenham line between two (already clipped) endpoints.
///
/// Endpoints are additionally clamped to the surface, so a stray
/// off-by-one from the float clip cannot write out of bounds.
pub fn bresenham<S: Surface>(surface: &S, start: (i32, i32), end: (i32, i32), color: Vec3) {
    let width = surface.width() as i32;
    let height = surface.height() as i32;

    let (mut x0, mut y0) = start;
    let (mut x1, mut y1) = end;
    x0 = x0.clamp(0, width - 1);
    x1 = x1.clamp(0, width - 1);
    y0 = y0.clamp(0, height - 1);
    y1 = y1.clamp(0, height - 1);

    let steep = (y1 - y0).abs() > (x1 - x0).abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }

    let dx = x1 - x0;
    let dy = (y1 - y0).abs();
    let mut error = dx / 2;
    let ystep = if y0 < y1 { 1 } else { -1 };
    let mut y = y0;

    for x in x0..=x1 {
        let pid = if steep { x * width + y } else { y * width + x };
        surface.draw_pixel(pid as usize, color);

        error -= dy;
        if error < 0 {
            y += ystep;
            error += dx;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::PixelGrid;
    use std::collections::HashSet;

    const W: usize = 32;
    const H: usize = 24;

    #[test]
    fn clip_keeps_interior_segments_untouched() {
        let clipped = cohen_sutherland(2.0, 3.0, 20.0, 10.0, W, H).unwrap();
        assert_eq!(clipped, ((2.0, 3.0), (20.0, 10.0)));
    }

    #[test]
    fn clip_rejects_fully_outside_segments() {
        assert!(cohen_sutherland(-5.0, 2.0, -1.0, 20.0, W, H).is_none());
        assert!(cohen_sutherland(5.0, -10.0, 20.0, -1.0, W, H).is_none());
    }

    #[test]
    fn clipped_endpoints_stay_inside_the_rectangle() {
        let segments = [
            (-10.0, -10.0, 50.0, 40.0),
            (16.0, -30.0, 16.0, 60.0),
            (-100.0, 12.0, 100.0, 12.0),
            (5.0, 5.0, 200.0, 7.0),
        ];
        for (x0, y0, x1, y1) in segments {
            let ((cx0, cy0), (cx1, cy1)) =
                cohen_sutherland(x0, y0, x1, y1, W, H).expect("segment crosses the screen");
            for (x, y) in [(cx0, cy0), (cx1, cy1)] {
                assert!(x >= 0.0 && x <= W as f32 - 1.0, "x = {x} out of range");
                assert!(y >= 0.0 && y <= H as f32 - 1.0, "y = {y} out of range");
            }
        }
    }

    fn drawn_pixels(start: (i32, i32), end: (i32, i32)) -> HashSet<(i32, i32)> {
        let grid = PixelGrid::new(W, H);
        bresenham(&grid, start, end, Vec3::new(1.0, 1.0, 1.0));
        (0..W * H)
            .filter(|&pid| grid.raw(pid) != 0)
            .map(|pid| ((pid % W) as i32, (pid / W) as i32))
            .collect()
    }

    #[test]
    fn bresenham_paths_are_eight_connected() {
        let cases = [
            ((0, 0), (31, 23)),
            ((31, 0), (0, 23)),
            ((4, 20), (28, 3)),
            ((7, 7), (7, 19)),
            ((2, 11), (29, 11)),
            ((5, 5), (5, 5)),
        ];
        for (start, end) in cases {
            let pixels = drawn_pixels(start, end);
            assert!(pixels.contains(&start), "{start:?} missing from line");
            assert!(pixels.contains(&end), "{end:?} missing from line");

            // Flood from the start; the whole path must be reachable
            // through 8-neighborhood steps.
            let mut seen = HashSet::from([start]);
            let mut frontier = vec![start];
            while let Some((x, y)) = frontier.pop() {
                for dx in -1..=1 {
                    for dy in -1..=1 {
                        let next = (x + dx, y + dy);
                        if pixels.contains(&next) && seen.insert(next) {
                            frontier.push(next);
                        }
                    }
                }
            }
            assert_eq!(seen, pixels, "disconnected line {start:?} -> {end:?}");
        }
    }
}
