// src/config.rs
//
// Processing configuration consumed by the pipeline assembler.
//
// Keys are camelCase so configuration written for the service layer
// (`enhancementEnabled`, `denoiseLevel`, ...) deserializes unchanged. Every
// field has a default; a partial document only overrides what it names.

use crate::engine::ExecutionOptions;
use crate::error::RasterError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Default worker count per stage when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Upper bound on workers per stage; larger configured values are lowered.
pub const MAX_CONCURRENCY: usize = 256;

/// Images below this many pixels run sequentially even when parallelism is on.
pub const DEFAULT_MIN_PARALLEL_PIXELS: u64 = 4096;

/// Image processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingConfig {
    /// Append Sobel edge detection to the OCR preprocessing pipeline.
    pub enhancement_enabled: bool,
    /// Contrast factor forwarded to downstream enhancement; not used by the
    /// transform pipeline itself.
    pub contrast_factor: f64,
    /// Brightness adjustment forwarded to downstream enhancement; not used by
    /// the transform pipeline itself.
    pub brightness_adjust: f64,
    /// 0 = no denoise, 1..=3 = box blur, >3 = gaussian blur.
    pub denoise_level: i32,
    pub gaussian_blur_sigma: f64,
    pub gaussian_blur_size: i32,
    pub box_blur_size: i32,
    pub sobel_threshold: u8,
    pub rotation_angle: f64,
    /// Workers per stage, clamped to `1..=MAX_CONCURRENCY`.
    pub concurrency_level: usize,
    pub use_parallel_processing: bool,
    pub min_parallel_pixels: u64,
    /// Work-item channel window for the dynamic strategy. `None` sizes the
    /// channel to the full pixel count.
    pub work_queue_capacity: Option<usize>,
    /// JPEG re-encode quality (1-100).
    pub jpeg_quality: u8,
    /// Re-compress PNG output losslessly with oxipng.
    pub optimize_png: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            enhancement_enabled: true,
            contrast_factor: 1.5,
            brightness_adjust: 0.1,
            denoise_level: 2,
            gaussian_blur_sigma: 1.0,
            gaussian_blur_size: 5,
            box_blur_size: 3,
            sobel_threshold: 50,
            rotation_angle: 0.0,
            concurrency_level: DEFAULT_CONCURRENCY,
            use_parallel_processing: true,
            min_parallel_pixels: DEFAULT_MIN_PARALLEL_PIXELS,
            work_queue_capacity: None,
            jpeg_quality: 75,
            optimize_png: true,
        }
    }
}

impl ProcessingConfig {
    /// Parse a JSON document. Missing keys keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, RasterError> {
        serde_json::from_str(raw).map_err(|e| RasterError::config_parse(e.to_string()))
    }

    /// Load configuration from a file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RasterError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "config file absent, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| RasterError::config_read(path.display().to_string(), e))?;
        let config = Self::from_json_str(&raw)?;
        info!(
            path = %path.display(),
            denoise_level = config.denoise_level,
            enhancement = config.enhancement_enabled,
            concurrency = config.concurrency_level,
            "loaded processing config"
        );
        Ok(config)
    }

    /// Execution options shared by every algorithm built from this config.
    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            concurrency: self.concurrency_level.clamp(1, MAX_CONCURRENCY),
            parallel: self.use_parallel_processing,
            min_parallel_pixels: self.min_parallel_pixels,
            work_queue_capacity: self.work_queue_capacity,
        }
    }
}
