//! Presentation surface contract between the pipeline and its output.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::math::Vec3;

/// A pixel target the renderer can draw into.
///
/// `draw_pixel` takes `&self` because the clear, wireframe, and shade
/// stages all write from multiple workers at once. Implementations must
/// make those writes sound (the bundled [`PixelGrid`] uses relaxed
/// atomic stores); the pipeline guarantees that two workers never write
/// different colors to the same pixel within a stage.
pub trait Surface: Sync {
    /// Width of the surface in pixels.
    fn width(&self) -> usize;
    /// Height of the surface in pixels.
    fn height(&self) -> usize;
    /// Writes one pixel. `pid` is the row-major index `y * width + x`,
    /// `rgb` has components in `[0, 1]`.
    fn draw_pixel(&self, pid: usize, rgb: Vec3);
}

/// Packs an `[0, 1]` RGB color into an RGBA word with full alpha.
#[inline]
pub fn pack_rgba(rgb: Vec3) -> u32 {
    let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
    (quantize(rgb.x) << 24) | (quantize(rgb.y) << 16) | (quantize(rgb.z) << 8) | 0xff
}

/// Unpacks the RGB components of an RGBA word back into `[0, 1]`.
#[inline]
pub fn unpack_rgba(word: u32) -> Vec3 {
    Vec3::new(
        ((word >> 24) & 0xff) as f32 / 255.0,
        ((word >> 16) & 0xff) as f32 / 255.0,
        ((word >> 8) & 0xff) as f32 / 255.0,
    )
}

/// Dense RGBA pixel store backing a [`Surface`].
///
/// Kept separate from the terminal canvas so tests can render into a bare
/// grid and inspect it.
pub struct PixelGrid {
    width: usize,
    height: usize,
    pixels: Vec<AtomicU32>,
}

impl PixelGrid {
    pub fn new(width: usize, height: usize) -> PixelGrid {
        assert!(width > 0 && height > 0, "surface must have a non-zero size");
        let mut pixels = Vec::new();
        pixels.resize_with(width * height, || AtomicU32::new(0));
        PixelGrid {
            width,
            height,
            pixels,
        }
    }

    /// Reads one pixel back as an RGB color.
    pub fn pixel(&self, pid: usize) -> Vec3 {
        unpack_rgba(self.pixels[pid].load(Ordering::Relaxed))
    }

    pub fn raw(&self, pid: usize) -> u32 {
        self.pixels[pid].load(Ordering::Relaxed)
    }
}

impl Surface for PixelGrid {
    #[inline(always)]
    fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn draw_pixel(&self, pid: usize, rgb: Vec3) {
        self.pixels[pid].store(pack_rgba(rgb), Ordering::Relaxed);
    }
}
