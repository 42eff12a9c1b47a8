// src/engine/algorithms/grayscale.rs

use super::ProcessorBase;
use crate::engine::executor::{for_each_row_chunk, ExecutionOptions};
use crate::engine::raster::{luma_of, RasterBuffer};
use image::{GrayImage, RgbaImage};

/// RGBA → Luma8 with 0.299/0.587/0.114 weights, truncated.
///
/// Luma input passes through as a copy, so running the stage twice gives the
/// same buffer as running it once.
#[derive(Clone, Debug)]
pub struct Grayscale {
    pub(super) base: ProcessorBase,
}

impl Grayscale {
    pub fn new(exec: ExecutionOptions) -> Self {
        Self {
            base: ProcessorBase::new("Grayscale", exec),
        }
    }

    pub fn process(&self, input: &RasterBuffer) -> RasterBuffer {
        match input {
            RasterBuffer::Luma(gray) => RasterBuffer::Luma(gray.clone()),
            RasterBuffer::Rgba(rgba) => RasterBuffer::Luma(self.convert(rgba)),
        }
    }

    pub(crate) fn convert(&self, src: &RgbaImage) -> GrayImage {
        let (width, height) = src.dimensions();
        let mut out = GrayImage::new(width, height);
        let row_len = width as usize;
        let src_raw = src.as_raw();

        for_each_row_chunk(&mut out, self.base.exec(), |rows, chunk| {
            for (dst_row, y) in chunk.chunks_exact_mut(row_len).zip(rows) {
                let start = y as usize * row_len * 4;
                let src_row = &src_raw[start..start + row_len * 4];
                for (dst, px) in dst_row.iter_mut().zip(src_row.chunks_exact(4)) {
                    *dst = luma_of(px[0], px[1], px[2]);
                }
            }
        });
        out
    }
}
