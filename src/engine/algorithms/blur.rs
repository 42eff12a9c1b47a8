// src/engine/algorithms/blur.rs
//
// Box and gaussian blur. Both compute one output pixel per work item over a
// square neighborhood clipped to the image; neither pads the edges.

use super::{normalize_kernel_size, normalize_sigma, ProcessorBase};
use crate::engine::executor::{distribute_pixels, ExecutionOptions, WorkItem};
use crate::engine::raster::RasterBuffer;

/// 8-bit to 16-bit sample scale (0xff → 0xffff).
const WIDEN: u32 = 257;

#[derive(Clone, Debug)]
pub struct BoxBlur {
    pub(super) base: ProcessorBase,
    size: u32,
}

impl BoxBlur {
    pub fn new(size: i32, exec: ExecutionOptions) -> Self {
        Self {
            base: ProcessorBase::new("Box Blur", exec),
            size: normalize_kernel_size(size),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn process(&self, input: &RasterBuffer) -> RasterBuffer {
        let (width, height) = input.dimensions();
        let radius = self.size / 2;

        let out = distribute_pixels(width, height, self.base.exec(), |WorkItem { x, y }| {
            let x0 = x.saturating_sub(radius);
            let x1 = x.saturating_add(radius).min(width - 1);
            let y0 = y.saturating_sub(radius);
            let y1 = y.saturating_add(radius).min(height - 1);

            let mut sum = [0u32; 3];
            let mut count = 0u32;
            for sy in y0..=y1 {
                for sx in x0..=x1 {
                    let rgb = input.rgb_at(sx, sy);
                    for (acc, c) in sum.iter_mut().zip(rgb) {
                        *acc += c as u32 * WIDEN;
                    }
                    count += 1;
                }
            }
            let avg = |acc: u32| ((acc / count) >> 8) as u8;
            [avg(sum[0]), avg(sum[1]), avg(sum[2]), 255]
        });
        RasterBuffer::Rgba(out)
    }
}

/// Normalized gaussian weights, row-major, `size * size` entries.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianKernel {
    sigma: f64,
    size: u32,
    weights: Vec<f64>,
}

impl GaussianKernel {
    pub fn new(sigma: f64, size: i32) -> Self {
        let sigma = normalize_sigma(sigma);
        let size = normalize_kernel_size(size);
        let radius = (size / 2) as i64;
        let two_sigma_sq = 2.0 * sigma * sigma;

        let mut weights = Vec::with_capacity((size as usize).saturating_mul(size as usize));
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                weights.push((-((dx * dx + dy * dy) as f64) / two_sigma_sq).exp());
            }
        }
        let sum: f64 = weights.iter().sum();
        for w in &mut weights {
            *w /= sum;
        }

        Self {
            sigma,
            size,
            weights,
        }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Weight at kernel cell (`kx`, `ky`), both in `0..size`.
    #[inline]
    pub fn weight(&self, kx: u32, ky: u32) -> f64 {
        self.weights[(ky * self.size + kx) as usize]
    }
}

#[derive(Clone, Debug)]
pub struct GaussianBlur {
    pub(super) base: ProcessorBase,
    kernel: GaussianKernel,
}

impl GaussianBlur {
    pub fn new(sigma: f64, size: i32, exec: ExecutionOptions) -> Self {
        Self {
            base: ProcessorBase::new("Gaussian Blur", exec),
            kernel: GaussianKernel::new(sigma, size),
        }
    }

    pub fn kernel(&self) -> &GaussianKernel {
        &self.kernel
    }

    pub fn process(&self, input: &RasterBuffer) -> RasterBuffer {
        let (width, height) = input.dimensions();
        let kernel = &self.kernel;
        let size = kernel.size();
        let radius = (size / 2) as i64;

        let out = distribute_pixels(width, height, self.base.exec(), |WorkItem { x, y }| {
            let mut sum = [0f64; 3];
            for ky in 0..size {
                let sy = y as i64 + ky as i64 - radius;
                if sy < 0 || sy >= height as i64 {
                    continue;
                }
                for kx in 0..size {
                    let sx = x as i64 + kx as i64 - radius;
                    if sx < 0 || sx >= width as i64 {
                        continue;
                    }
                    let w = kernel.weight(kx, ky);
                    let rgb = input.rgb_at(sx as u32, sy as u32);
                    for (acc, c) in sum.iter_mut().zip(rgb) {
                        *acc += (c as u32 * WIDEN) as f64 * w;
                    }
                }
            }
            let narrow = |acc: f64| (acc / WIDEN as f64).round().clamp(0.0, 255.0) as u8;
            [narrow(sum[0]), narrow(sum[1]), narrow(sum[2]), 255]
        });
        RasterBuffer::Rgba(out)
    }
}
