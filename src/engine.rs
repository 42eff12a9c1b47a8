// src/engine.rs
//
// The core of manuscript-raster. A staged pipeline that:
// 1. Decodes JPEG/PNG into an RGBA8 or Luma8 raster
// 2. Runs the selected transforms one stage at a time, each stage internally
//    parallel (row chunks or per-pixel work items)
// 3. Re-encodes in the input's format
//
// This file is a facade over the modules in engine/

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA. Beyond this is likely malicious.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

pub mod algorithms;
mod api;
mod assembler;
mod cache;
mod common;
mod decoder;
mod encoder;
mod executor;
mod pipeline;
mod pool;
mod raster;

pub use algorithms::{normalize_kernel_size, Algorithm, GaussianKernel, ProcessorBase, MAX_KERNEL_SIZE};
pub use api::{ImageProcessor, ProcessedOutput};
pub use assembler::PipelineAssembler;
pub use cache::{CacheKey, CacheStats, ProcessedImageCache};
pub use common::run_with_panic_policy;
pub use decoder::{check_dimensions, decode_image, detect_format, ensure_dimensions_safe};
pub use encoder::{encode_as, encode_jpeg, encode_png};
pub use executor::{distribute_pixels, for_each_row_chunk, row_ranges, ExecutionOptions, WorkItem};
pub use pipeline::{run_pipeline, PixelLayout, Pipeline, PipelineOutput, StageTiming};
pub use raster::{luma_of, RasterBuffer};
