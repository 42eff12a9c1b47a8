// src/engine/raster.rs
//
// In-memory pixel store threaded through the pipeline.
//
// Two layouts only: RGBA8 for color work and Luma8 for grayscale/edge output.
// Every decoded layout other than Luma8 is normalized to RGBA8 up front so
// the algorithms never deal with 16-bit or float samples.

use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};

const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Luma of an 8-bit RGB triple, truncated.
#[inline]
pub fn luma_of(r: u8, g: u8, b: u8) -> u8 {
    (LUMA_WEIGHTS[0] * r as f64 + LUMA_WEIGHTS[1] * g as f64 + LUMA_WEIGHTS[2] * b as f64) as u8
}

#[derive(Clone, Debug, PartialEq)]
pub enum RasterBuffer {
    Rgba(RgbaImage),
    Luma(GrayImage),
}

impl RasterBuffer {
    pub fn from_dynamic(img: DynamicImage) -> Self {
        match img {
            DynamicImage::ImageLuma8(gray) => RasterBuffer::Luma(gray),
            DynamicImage::ImageRgba8(rgba) => RasterBuffer::Rgba(rgba),
            other => RasterBuffer::Rgba(other.to_rgba8()),
        }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            RasterBuffer::Rgba(rgba) => DynamicImage::ImageRgba8(rgba),
            RasterBuffer::Luma(gray) => DynamicImage::ImageLuma8(gray),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            RasterBuffer::Rgba(img) => img.dimensions(),
            RasterBuffer::Luma(img) => img.dimensions(),
        }
    }

    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    pub fn is_luma(&self) -> bool {
        matches!(self, RasterBuffer::Luma(_))
    }

    /// Layout name used in logs and metrics.
    pub fn layout(&self) -> &'static str {
        match self {
            RasterBuffer::Rgba(_) => "rgba8",
            RasterBuffer::Luma(_) => "luma8",
        }
    }

    /// Size of the pixel store in bytes.
    pub fn byte_len(&self) -> usize {
        match self {
            RasterBuffer::Rgba(img) => img.as_raw().len(),
            RasterBuffer::Luma(img) => img.as_raw().len(),
        }
    }

    /// Caller guarantees `x < width` and `y < height`.
    #[inline]
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        match self {
            RasterBuffer::Rgba(img) => {
                let Rgba([r, g, b, _]) = *img.get_pixel(x, y);
                [r, g, b]
            }
            RasterBuffer::Luma(img) => {
                let Luma([v]) = *img.get_pixel(x, y);
                [v, v, v]
            }
        }
    }

    #[inline]
    pub fn rgba_at(&self, x: u32, y: u32) -> [u8; 4] {
        match self {
            RasterBuffer::Rgba(img) => img.get_pixel(x, y).0,
            RasterBuffer::Luma(img) => {
                let Luma([v]) = *img.get_pixel(x, y);
                [v, v, v, 255]
            }
        }
    }
}
