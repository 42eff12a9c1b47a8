// src/engine/decoder.rs
//
// Decoder operations: sniff the format, guard dimensions, decode JPEG/PNG.

use crate::engine::common::run_with_panic_policy;
use crate::engine::raster::RasterBuffer;
use crate::error::RasterError;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::debug;

use crate::engine::{MAX_DIMENSION, MAX_PIXELS};

// Type alias for Result - always use RasterError to preserve error taxonomy
// This ensures that decode errors are properly classified (CodecError, ResourceLimit, etc.)
// rather than being converted to generic InternalBug errors.
type DecoderResult<T> = std::result::Result<T, RasterError>;

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Lowercase name of a format, as reported in errors and metrics.
pub fn format_name(format: ImageFormat) -> String {
    format!("{format:?}").to_lowercase()
}

/// Only JPEG and PNG are decoded; they are also the only encode targets.
pub fn is_supported(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Jpeg | ImageFormat::Png)
}

/// Decode with the image crate under the global panic policy.
fn decode_with_image_crate(data: &[u8], format: ImageFormat) -> DecoderResult<DynamicImage> {
    let context = match format {
        ImageFormat::Jpeg => "decode:jpeg",
        _ => "decode:png",
    };
    run_with_panic_policy(context, || {
        image::load_from_memory_with_format(data, format)
            .map_err(|e| RasterError::decode_failed(format!("{}: {e}", format_name(format))))
    })
}

/// Unified decode entrypoint:
/// - Detect format once (magic bytes)
/// - Reject anything but JPEG/PNG before touching pixel data
/// - Check header dimensions, decode, and check again
/// - Return the decoded buffer and detected format
pub fn decode_image(bytes: &[u8]) -> DecoderResult<(RasterBuffer, ImageFormat)> {
    if bytes.is_empty() {
        return Err(RasterError::decode_failed("empty input"));
    }
    let format = detect_format(bytes)
        .ok_or_else(|| RasterError::decode_failed("unrecognized image format"))?;
    if !is_supported(format) {
        return Err(RasterError::unsupported_format(format_name(format)));
    }

    ensure_dimensions_safe(bytes)?;
    let img = decode_with_image_crate(bytes, format)?;
    // Header dimensions are not trusted; check what was actually decoded.
    check_dimensions(img.width(), img.height())?;

    debug!(
        target: "manuscript_raster::codec",
        format = ?format,
        width = img.width(),
        height = img.height(),
        color = ?img.color(),
        "decoded"
    );
    Ok((RasterBuffer::from_dynamic(img), format))
}

/// Check if image dimensions are within safe limits.
/// Returns an error if the image is too large (potential decompression bomb).
pub fn check_dimensions(width: u32, height: u32) -> DecoderResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(RasterError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(RasterError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Width and height from the image header, without decoding pixels.
pub fn read_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Inspect encoded bytes and ensure the image dimensions are safe before decoding.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> DecoderResult<()> {
    match read_dimensions(bytes) {
        Some((width, height)) => check_dimensions(width, height),
        None => Ok(()),
    }
}
