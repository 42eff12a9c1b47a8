// lib.rs
//
// manuscript-raster: concurrent image preprocessing for manuscript OCR
//
// Design goals:
// - Closed set of pixel transforms, each parallel inside its own stage
// - Stages chained by blocking handoffs, strictly in order
// - Deterministic output regardless of worker count
// - Only JPEG/PNG in, the same format out

pub mod config;
pub mod engine;
pub mod error;
pub mod ops;

pub use config::ProcessingConfig;
pub use engine::{ImageProcessor, ProcessedImageCache, ProcessedOutput};
pub use error::{RasterError, Result};
pub use ops::{Operation, TransformRequest};

use engine::StageTiming;

/// Schema version of [`ProcessingMetrics`].
pub const PROCESSING_METRICS_VERSION: &str = "1.0.0";

/// Processing metrics for performance monitoring
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessingMetrics {
    /// Schema version for compatibility negotiation
    pub version: String,
    /// Decode stage duration in milliseconds
    pub decode_ms: f64,
    /// Pipeline (all transform stages) duration in milliseconds
    pub ops_ms: f64,
    /// Encode stage duration in milliseconds
    pub encode_ms: f64,
    /// Total wall-clock duration in milliseconds
    pub total_ms: f64,
    /// Input size in bytes
    pub bytes_in: u64,
    /// Output size in bytes
    pub bytes_out: u64,
    /// Compression ratio (bytes_out / bytes_in)
    pub compression_ratio: f64,
    /// Detected input format (lowercase: jpeg, png)
    pub format_in: Option<String>,
    /// Output format
    pub format_out: String,
    /// Output canvas width
    pub width: u32,
    /// Output canvas height
    pub height: u32,
    /// Per-stage wall time, in pipeline order
    pub stages: Vec<StageTiming>,
    /// True when the result came from a [`ProcessedImageCache`]
    pub cache_hit: bool,
}

impl Default for ProcessingMetrics {
    fn default() -> Self {
        Self {
            version: PROCESSING_METRICS_VERSION.to_string(),
            decode_ms: 0.0,
            ops_ms: 0.0,
            encode_ms: 0.0,
            total_ms: 0.0,
            bytes_in: 0,
            bytes_out: 0,
            compression_ratio: 0.0,
            format_in: None,
            format_out: String::new(),
            width: 0,
            height: 0,
            stages: Vec::new(),
            cache_hit: false,
        }
    }
}

impl ProcessingMetrics {
    /// Fill in output size and the derived ratio.
    pub fn set_output_size(&mut self, bytes_out: usize) {
        self.bytes_out = bytes_out as u64;
        self.compression_ratio = if self.bytes_in > 0 {
            self.bytes_out as f64 / self.bytes_in as f64
        } else {
            0.0
        };
    }
}
