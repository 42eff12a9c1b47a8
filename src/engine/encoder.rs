// src/engine/encoder.rs
//
// Encoder operations: JPEG and PNG, always in the format the input came in.

use crate::engine::common::run_with_panic_policy;
use crate::engine::raster::RasterBuffer;
use crate::error::RasterError;
use crate::ops::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageFormat, RgbImage};
use std::borrow::Cow;
use std::io::Cursor;
use tracing::debug;

use crate::engine::MAX_DIMENSION;

// Type alias for Result - always use RasterError to preserve error taxonomy
// This ensures that encode errors are properly classified (CodecError, etc.)
// rather than being converted to generic InternalBug errors.
type EncoderResult<T> = std::result::Result<T, RasterError>;

/// oxipng preset used for PNG re-compression (0 fastest, 6 smallest).
const PNG_OPTIMIZE_PRESET: u8 = 2;

fn validate_canvas(format: &'static str, width: u32, height: u32) -> EncoderResult<()> {
    if width == 0 || height == 0 {
        return Err(RasterError::encode_failed(
            format,
            "Invalid image dimensions: width or height is zero",
        ));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(RasterError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    Ok(())
}

/// Encode to baseline JPEG.
///
/// JPEG has no alpha channel: RGBA buffers are flattened by dropping alpha,
/// so transparent regions (e.g. rotation corners) come out black. Luma
/// buffers are written as single-component JPEG.
pub fn encode_jpeg(buffer: &RasterBuffer, quality: u8) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:jpeg", || {
        let quality = quality.clamp(1, 100);
        let (w, h) = buffer.dimensions();
        validate_canvas("jpeg", w, h)?;

        let (pixels, color): (Cow<'_, [u8]>, ExtendedColorType) = match buffer {
            RasterBuffer::Luma(gray) => (Cow::Borrowed(gray.as_raw()), ExtendedColorType::L8),
            RasterBuffer::Rgba(rgba) => {
                let rgb = RgbImage::from_fn(w, h, |x, y| {
                    let [r, g, b, _] = rgba.get_pixel(x, y).0;
                    image::Rgb([r, g, b])
                });
                (Cow::Owned(rgb.into_raw()), ExtendedColorType::Rgb8)
            }
        };

        let estimated_size = (w as usize * h as usize / 4).max(4096);
        let mut output = Vec::with_capacity(estimated_size);
        JpegEncoder::new_with_quality(&mut output, quality)
            .encode(&pixels, w, h, color)
            .map_err(|e| RasterError::encode_failed("jpeg", format!("JPEG encode failed: {e}")))?;
        Ok(output)
    })
}

/// Encode to PNG using image crate, optionally re-compressed by oxipng.
pub fn encode_png(buffer: &RasterBuffer, optimize: bool) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:png", || {
        let (w, h) = buffer.dimensions();
        validate_canvas("png", w, h)?;

        let img: DynamicImage = buffer.clone().into_dynamic();
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| RasterError::encode_failed("png", format!("PNG encode failed: {e}")))?;

        if !optimize {
            return Ok(buf);
        }

        // Lossless re-compression; ancillary chunks are left alone.
        let mut options = oxipng::Options::from_preset(PNG_OPTIMIZE_PRESET);
        options.strip = oxipng::StripChunks::None;

        let optimized = oxipng::optimize_from_memory(&buf, &options).map_err(|e| {
            RasterError::encode_failed("png", format!("oxipng optimization failed: {e}"))
        })?;

        debug!(
            target: "manuscript_raster::codec",
            before = buf.len(),
            after = optimized.len(),
            "png optimized"
        );
        // oxipng can fail to improve on tiny images; keep the smaller one.
        Ok(if optimized.len() < buf.len() {
            optimized
        } else {
            buf
        })
    })
}

/// Encode `buffer` as `format`.
pub fn encode_as(buffer: &RasterBuffer, format: &OutputFormat) -> EncoderResult<Vec<u8>> {
    let encoded = match *format {
        OutputFormat::Jpeg { quality } => encode_jpeg(buffer, quality)?,
        OutputFormat::Png { optimize } => encode_png(buffer, optimize)?,
    };
    debug!(
        target: "manuscript_raster::codec",
        format = format.as_str(),
        bytes = encoded.len(),
        width = buffer.width(),
        height = buffer.height(),
        "encoded"
    );
    Ok(encoded)
}
