// src/engine/algorithms/flip.rs

use super::ProcessorBase;
use crate::engine::executor::{for_each_row_chunk, ExecutionOptions};
use crate::engine::raster::RasterBuffer;
use image::{ImageBuffer, Pixel};

/// Mirror rows top to bottom. The pixel layout is kept as is.
#[derive(Clone, Debug)]
pub struct UpsideDown {
    pub(super) base: ProcessorBase,
}

impl UpsideDown {
    pub fn new(exec: ExecutionOptions) -> Self {
        Self {
            base: ProcessorBase::new("Upside Down", exec),
        }
    }

    pub fn process(&self, input: &RasterBuffer) -> RasterBuffer {
        match input {
            RasterBuffer::Rgba(img) => RasterBuffer::Rgba(self.flip(img)),
            RasterBuffer::Luma(img) => RasterBuffer::Luma(self.flip(img)),
        }
    }

    fn flip<P>(&self, src: &ImageBuffer<P, Vec<u8>>) -> ImageBuffer<P, Vec<u8>>
    where
        P: Pixel<Subpixel = u8>,
    {
        let (width, height) = src.dimensions();
        let mut out = ImageBuffer::<P, Vec<u8>>::new(width, height);
        let row_len = width as usize * P::CHANNEL_COUNT as usize;
        let src_raw = src.as_raw();

        for_each_row_chunk(&mut out, self.base.exec(), |rows, chunk| {
            for (dst_row, y) in chunk.chunks_exact_mut(row_len).zip(rows) {
                let start = (height - 1 - y) as usize * row_len;
                dst_row.copy_from_slice(&src_raw[start..start + row_len]);
            }
        });
        out
    }
}
