//! Terminal presentation surface.
//!
//! Owns the RGBA pixel buffer the renderer draws into and downsamples it
//! by integer `cell_w x cell_h` blocks into a colored character grid.
//! The renderer itself performs no vertical flip, so the blend step reads
//! pixel rows top-down from the highest Y band: NDC up stays up on
//! screen. A text overlay can be blended over the grid before display.

use std::io::{self, Write};

use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};

use crate::math::Vec3;
use crate::surface::{PixelGrid, Surface};

/// Glyphs ordered by increasing ink coverage.
const RAMP: &[u8] = b" .':+*&%#@";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    glyph: char,
    color: (u8, u8, u8),
}

const BLANK: Cell = Cell {
    glyph: ' ',
    color: (0, 0, 0),
};

pub struct TermCanvas {
    grid: PixelGrid,
    cols: usize,
    rows: usize,
    cell_w: usize,
    cell_h: usize,
    cells: Vec<Cell>,
    text_color: (u8, u8, u8),
}

impl TermCanvas {
    /// A canvas of `cols x rows` character cells, each sampling a
    /// `cell_w x cell_h` pixel block.
    pub fn new(cols: usize, rows: usize, cell_w: usize, cell_h: usize) -> TermCanvas {
        assert!(cols > 0 && rows > 0, "canvas must have a non-zero size");
        assert!(cell_w > 0 && cell_h > 0, "cells must cover at least one pixel");
        TermCanvas {
            grid: PixelGrid::new(cols * cell_w, rows * cell_h),
            cols,
            rows,
            cell_w,
            cell_h,
            cells: vec![BLANK; cols * rows],
            text_color: (255, 255, 255),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Downsamples the pixel buffer into the character grid.
    pub fn blend(&mut self) {
        let width = self.grid.width();
        for row in 0..self.rows {
            // Row 0 of the terminal shows the topmost (highest Y) band.
            let y_base = self.grid.height() - (row + 1) * self.cell_h;
            for col in 0..self.cols {
                let x_base = col * self.cell_w;

                let mut sum = Vec3::zeros();
                for dy in 0..self.cell_h {
                    for dx in 0..self.cell_w {
                        sum += self.grid.pixel((y_base + dy) * width + x_base + dx);
                    }
                }
                let avg = sum / (self.cell_w * self.cell_h) as f32;

                let luma = 0.299 * avg.x + 0.587 * avg.y + 0.114 * avg.z;
                let glyph =
                    RAMP[(luma.clamp(0.0, 1.0) * (RAMP.len() - 1) as f32).round() as usize] as char;

                self.cells[row * self.cols + col] = Cell {
                    glyph,
                    color: quantize(avg),
                };
            }
        }
    }

    /// Blends `text` over the character grid starting at the top-left
    /// cell, one terminal row per line.
    pub fn blend_overlay(&mut self, text: &str) {
        for (row, line) in text.lines().enumerate() {
            if row >= self.rows {
                break;
            }
            for (col, glyph) in line.chars().enumerate() {
                if col >= self.cols {
                    break;
                }
                self.cells[row * self.cols + col] = Cell {
                    glyph,
                    color: self.text_color,
                };
            }
        }
    }

    /// Writes the character grid to `out` with 24-bit foreground colors.
    pub fn display<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut current = None;
        for row in 0..self.rows {
            queue!(out, cursor::MoveTo(0, row as u16))?;
            for cell in &self.cells[row * self.cols..][..self.cols] {
                if current != Some(cell.color) {
                    let (r, g, b) = cell.color;
                    queue!(out, SetForegroundColor(Color::Rgb { r, g, b }))?;
                    current = Some(cell.color);
                }
                queue!(out, Print(cell.glyph))?;
            }
        }
        queue!(out, ResetColor)?;
        out.flush()
    }

    #[cfg(test)]
    fn cell(&self, col: usize, row: usize) -> (char, (u8, u8, u8)) {
        let cell = self.cells[row * self.cols + col];
        (cell.glyph, cell.color)
    }
}

fn quantize(rgb: Vec3) -> (u8, u8, u8) {
    let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    (q(rgb.x), q(rgb.y), q(rgb.z))
}

impl Surface for TermCanvas {
    #[inline(always)]
    fn width(&self) -> usize {
        self.grid.width()
    }

    #[inline(always)]
    fn height(&self) -> usize {
        self.grid.height()
    }

    #[inline]
    fn draw_pixel(&self, pid: usize, rgb: Vec3) {
        self.grid.draw_pixel(pid, rgb);
    }
}
