// src/engine/algorithms/rotate.rs
//
// Rotation by an arbitrary angle.
//
// `Rotate` grows the canvas to fit the rotated bounds and samples the source
// by inverse mapping (nearest neighbor, no interpolation). `ShearRotate`
// keeps the input canvas and applies three truncating forward shears, so
// pixels pushed off the canvas at any stage are lost.

use super::ProcessorBase;
use crate::engine::executor::{distribute_pixels, for_each_row_chunk, ExecutionOptions, WorkItem};
use crate::engine::raster::RasterBuffer;
use image::{Rgba, RgbaImage};

const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

fn finite_or_zero(degrees: f64) -> f64 {
    if degrees.is_finite() {
        degrees
    } else {
        0.0
    }
}

#[derive(Clone, Debug)]
pub struct Rotate {
    pub(super) base: ProcessorBase,
    degrees: f64,
    sin: f64,
    cos: f64,
}

impl Rotate {
    pub fn new(degrees: f64, exec: ExecutionOptions) -> Self {
        let degrees = finite_or_zero(degrees);
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            base: ProcessorBase::new("Rotate", exec),
            degrees,
            sin,
            cos,
        }
    }

    pub fn degrees(&self) -> f64 {
        self.degrees
    }

    /// Canvas that holds the rotated image. Neither side is ever 0.
    pub fn output_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let (w, h) = (width as f64, height as f64);
        let (sin, cos) = (self.sin.abs(), self.cos.abs());
        let new_w = (w * cos + h * sin) as u32;
        let new_h = (w * sin + h * cos) as u32;
        (new_w.max(1), new_h.max(1))
    }

    pub fn process(&self, input: &RasterBuffer) -> RasterBuffer {
        let (width, height) = input.dimensions();
        let (new_w, new_h) = self.output_dimensions(width, height);
        let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
        let (ncx, ncy) = (new_w as f64 / 2.0, new_h as f64 / 2.0);
        let (sin, cos) = (self.sin, self.cos);

        let out = distribute_pixels(new_w, new_h, self.base.exec(), |WorkItem { x, y }| {
            let dx = x as f64 - ncx;
            let dy = y as f64 - ncy;
            let sx = cos * dx + sin * dy + cx;
            let sy = -sin * dx + cos * dy + cy;
            if sx >= 0.0 && sx < width as f64 && sy >= 0.0 && sy < height as f64 {
                input.rgba_at(sx as u32, sy as u32)
            } else {
                TRANSPARENT
            }
        });
        RasterBuffer::Rgba(out)
    }
}

#[derive(Clone, Debug)]
pub struct ShearRotate {
    pub(super) base: ProcessorBase,
    degrees: f64,
    /// Point-reflect before shearing (|θ| > 90°).
    half_turn: bool,
    /// tan(θ/2) of the residual angle, used by both horizontal shears.
    tan_half: f64,
    /// sin(θ) of the residual angle, used by the vertical shear.
    sin: f64,
}

impl ShearRotate {
    pub fn new(degrees: f64, exec: ExecutionOptions) -> Self {
        let degrees = finite_or_zero(degrees);
        let mut residual = degrees % 360.0;
        if residual > 180.0 {
            residual -= 360.0;
        } else if residual <= -180.0 {
            residual += 360.0;
        }
        let half_turn = residual.abs() > 90.0;
        if half_turn {
            residual -= 180.0_f64.copysign(residual);
        }
        let theta = residual.to_radians();

        Self {
            base: ProcessorBase::new("Shear Rotate", exec),
            degrees,
            half_turn,
            tan_half: (theta / 2.0).tan(),
            sin: theta.sin(),
        }
    }

    pub fn degrees(&self) -> f64 {
        self.degrees
    }

    /// Three forward shears on the input canvas: horizontal by `-tan(θ/2)`,
    /// vertical by `sin(θ)`, horizontal again. Offsets are measured from the
    /// canvas center. Every stage truncates the new coordinate toward zero
    /// and drops pixels that leave the canvas, so the result is lossy.
    pub fn process(&self, input: &RasterBuffer) -> RasterBuffer {
        let (width, height) = input.dimensions();
        let cx = (width as f64 - 1.0) / 2.0;
        let cy = (height as f64 - 1.0) / 2.0;
        let exec = self.base.exec();

        let mut stage = RgbaImage::from_fn(width, height, |x, y| {
            let (sx, sy) = if self.half_turn {
                (width - 1 - x, height - 1 - y)
            } else {
                (x, y)
            };
            Rgba(input.rgba_at(sx, sy))
        });
        let horizontal = |x: u32, y: u32| x as f64 - (y as f64 - cy) * self.tan_half;
        let vertical = |x: u32, y: u32| y as f64 + (x as f64 - cx) * self.sin;

        stage = shear_pass(&stage, exec, Shear::Horizontal, horizontal);
        stage = shear_pass(&stage, exec, Shear::Vertical, vertical);
        stage = shear_pass(&stage, exec, Shear::Horizontal, horizontal);
        RasterBuffer::Rgba(stage)
    }
}

/// Direction a shear stage moves pixels in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shear {
    /// Along the row: only x changes.
    Horizontal,
    /// Along the column: only y changes.
    Vertical,
}

/// One forward shear stage of `src`.
///
/// `target(x, y)` is the new x (horizontal) or new y (vertical) of source
/// pixel (`x`, `y`) before truncation. A destination receives the last
/// source in row-major order whose truncated target lands on it, and stays
/// transparent when none does. Destinations are gathered independently so
/// the stage can run on row chunks.
fn shear_pass<F>(src: &RgbaImage, exec: &ExecutionOptions, shear: Shear, target: F) -> RgbaImage
where
    F: Fn(u32, u32) -> f64 + Sync,
{
    let (width, height) = src.dimensions();
    let mut out = RgbaImage::new(width, height);
    let row_len = width as usize * 4;

    for_each_row_chunk(&mut out, exec, |rows, chunk| {
        for (dst_row, y) in chunk.chunks_exact_mut(row_len).zip(rows) {
            for (x, px) in dst_row.chunks_exact_mut(4).enumerate() {
                let x = x as u32;
                let source = match shear {
                    Shear::Horizontal => {
                        last_landing(x, width, |sx| target(sx, y)).map(|sx| (sx, y))
                    }
                    Shear::Vertical => {
                        last_landing(y, height, |sy| target(x, sy)).map(|sy| (x, sy))
                    }
                };
                if let Some((sx, sy)) = source {
                    px.copy_from_slice(&src.get_pixel(sx, sy).0);
                }
            }
        }
    });
    out
}

/// Largest `s` in `0..len` with `target(s) as i64 == dst`.
///
/// Along one row (or column) a shear adds the same offset to every
/// coordinate, so the only candidates sit next to `dst - floor(offset)`.
/// Truncation toward zero also lands `(-1, 0)` on 0, one below that.
fn last_landing(dst: u32, len: u32, target: impl Fn(u32) -> f64) -> Option<u32> {
    let dst = dst as i64;
    let offset = target(dst as u32) - dst as f64;
    if !offset.is_finite() {
        return None;
    }
    let base = dst - offset.floor() as i64;
    (base - 2..=base + 1)
        .rev()
        .filter(|s| (0..len as i64).contains(s))
        .map(|s| s as u32)
        .find(|&s| target(s) as i64 == dst)
}
