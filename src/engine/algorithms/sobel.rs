// src/engine/algorithms/sobel.rs

use super::{Grayscale, ProcessorBase};
use crate::engine::executor::{for_each_row_chunk, ExecutionOptions};
use crate::engine::raster::RasterBuffer;
use image::GrayImage;
use std::borrow::Cow;

const GX: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const GY: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// Binary edge map: 255 where the gradient magnitude exceeds the threshold.
/// The one-pixel border is always 0.
#[derive(Clone, Debug)]
pub struct SobelEdgeDetector {
    pub(super) base: ProcessorBase,
    threshold: u8,
    grayscale: Grayscale,
}

impl SobelEdgeDetector {
    pub fn new(threshold: u8, exec: ExecutionOptions) -> Self {
        Self {
            base: ProcessorBase::new("Sobel Edge Detection", exec),
            threshold,
            grayscale: Grayscale::new(exec),
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn process(&self, input: &RasterBuffer) -> RasterBuffer {
        let gray: Cow<'_, GrayImage> = match input {
            RasterBuffer::Luma(gray) => Cow::Borrowed(gray),
            RasterBuffer::Rgba(rgba) => Cow::Owned(self.grayscale.convert(rgba)),
        };
        let (width, height) = gray.dimensions();
        let mut out = GrayImage::new(width, height);
        if width < 3 || height < 3 {
            return RasterBuffer::Luma(out);
        }

        let src = gray.as_raw();
        let row_len = width as usize;
        let threshold = self.threshold as f64;

        for_each_row_chunk(&mut out, self.base.exec(), |rows, chunk| {
            for (dst_row, y) in chunk.chunks_exact_mut(row_len).zip(rows) {
                if y == 0 || y == height - 1 {
                    continue;
                }
                let y = y as usize;
                for x in 1..row_len - 1 {
                    let mut gx = 0i32;
                    let mut gy = 0i32;
                    for (ky, (gx_row, gy_row)) in GX.iter().zip(GY.iter()).enumerate() {
                        let base = (y + ky - 1) * row_len + x - 1;
                        for kx in 0..3 {
                            let v = src[base + kx] as i32;
                            gx += gx_row[kx] * v;
                            gy += gy_row[kx] * v;
                        }
                    }
                    let magnitude = ((gx * gx + gy * gy) as f64).sqrt();
                    dst_row[x] = if magnitude > threshold { 255 } else { 0 };
                }
            }
        });
        RasterBuffer::Luma(out)
    }
}
