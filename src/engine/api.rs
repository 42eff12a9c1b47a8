// src/engine/api.rs
//
// ImageProcessor: the public entry points.
// decode → assemble pipeline → run stages → encode in the input's format.

use super::assembler::PipelineAssembler;
use super::cache::{CacheKey, ProcessedImageCache};
use super::decoder::{decode_image, detect_format, format_name, read_dimensions};
use super::encoder::encode_as;
use super::pipeline::{Pipeline, PipelineOutput};
use crate::config::ProcessingConfig;
use crate::error::{RasterError, Result};
use crate::ops::{OutputFormat, TransformRequest};
use crate::ProcessingMetrics;
use serde_json::{Map, Value};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Encoded result plus the metrics gathered while producing it.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessedOutput {
    pub data: Vec<u8>,
    pub metrics: ProcessingMetrics,
}

/// Synchronous image processor built from one configuration.
///
/// Algorithm instances are built once in [`PipelineAssembler::new`] and
/// reused for every call; the processor itself is `Send + Sync`.
#[derive(Clone, Debug)]
pub struct ImageProcessor {
    assembler: PipelineAssembler,
}

impl ImageProcessor {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            assembler: PipelineAssembler::new(config),
        }
    }

    pub fn config(&self) -> &ProcessingConfig {
        self.assembler.config()
    }

    pub fn assembler(&self) -> &PipelineAssembler {
        &self.assembler
    }

    // =========================================================================
    // OCR PREPROCESSING
    // =========================================================================

    /// Grayscale, optional edge enhancement and denoising, re-encoded in the
    /// input's format.
    pub fn process_for_ocr(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.process_for_ocr_with_metrics(bytes).map(|out| out.data)
    }

    #[instrument(level = "debug", skip_all, fields(bytes_in = bytes.len()))]
    pub fn process_for_ocr_with_metrics(&self, bytes: &[u8]) -> Result<ProcessedOutput> {
        self.execute(bytes, &self.assembler.for_ocr(), "ocr")
    }

    pub fn process_for_ocr_cached(
        &self,
        bytes: &[u8],
        cache: &ProcessedImageCache,
    ) -> Result<ProcessedOutput> {
        self.execute_cached(bytes, &self.assembler.for_ocr(), "ocr", cache)
    }

    // =========================================================================
    // AD-HOC TRANSFORMATIONS
    // =========================================================================

    pub fn apply_transformations(&self, bytes: &[u8], request: &TransformRequest) -> Result<Vec<u8>> {
        self.apply_transformations_with_metrics(bytes, request)
            .map(|out| out.data)
    }

    /// Same as [`apply_transformations`](Self::apply_transformations), taking
    /// the loosely typed request map (`upsideDown`, `rotationAngle`, ...).
    pub fn apply_transformations_map(&self, bytes: &[u8], request: &Map<String, Value>) -> Result<Vec<u8>> {
        self.apply_transformations(bytes, &TransformRequest::from_map(request))
    }

    #[instrument(level = "debug", skip_all, fields(bytes_in = bytes.len()))]
    pub fn apply_transformations_with_metrics(
        &self,
        bytes: &[u8],
        request: &TransformRequest,
    ) -> Result<ProcessedOutput> {
        self.execute(bytes, &self.assembler.for_request(request), "transform")
    }

    pub fn apply_transformations_cached(
        &self,
        bytes: &[u8],
        request: &TransformRequest,
        cache: &ProcessedImageCache,
    ) -> Result<ProcessedOutput> {
        self.execute_cached(
            bytes,
            &self.assembler.for_request(request),
            "transform",
            cache,
        )
    }

    // =========================================================================
    // EXECUTION
    // =========================================================================

    fn output_format_for(&self, bytes: &[u8]) -> Option<OutputFormat> {
        let config = self.config();
        detect_format(bytes)
            .and_then(|f| OutputFormat::for_input(f, config.jpeg_quality, config.optimize_png))
    }

    fn execute(&self, bytes: &[u8], pipeline: &Pipeline, label: &'static str) -> Result<ProcessedOutput> {
        let started = Instant::now();
        let mut metrics = ProcessingMetrics {
            bytes_in: bytes.len() as u64,
            ..ProcessingMetrics::default()
        };

        // 1. Decode
        let decode_start = Instant::now();
        let (buffer, format) = decode_image(bytes)?;
        let output_format = {
            let config = self.config();
            OutputFormat::for_input(format, config.jpeg_quality, config.optimize_png)
                .ok_or_else(|| RasterError::unsupported_format(format_name(format)))?
        };
        metrics.decode_ms = decode_start.elapsed().as_secs_f64() * 1000.0;
        metrics.format_in = Some(format_name(format));

        info!(
            target: "manuscript_raster::api",
            request = label,
            format = output_format.as_str(),
            width = buffer.width(),
            height = buffer.height(),
            stages = ?pipeline.names(),
            "processing image"
        );

        // 2. Pipeline
        let ops_start = Instant::now();
        let PipelineOutput { buffer, timings } = pipeline.run(buffer)?;
        metrics.ops_ms = ops_start.elapsed().as_secs_f64() * 1000.0;
        metrics.stages = timings;
        metrics.width = buffer.width();
        metrics.height = buffer.height();

        // 3. Encode
        let encode_start = Instant::now();
        let data = encode_as(&buffer, &output_format)?;
        metrics.encode_ms = encode_start.elapsed().as_secs_f64() * 1000.0;
        metrics.format_out = output_format.as_str().to_string();
        metrics.set_output_size(data.len());
        metrics.total_ms = started.elapsed().as_secs_f64() * 1000.0;

        debug!(
            target: "manuscript_raster::api",
            request = label,
            decode_ms = metrics.decode_ms,
            ops_ms = metrics.ops_ms,
            encode_ms = metrics.encode_ms,
            bytes_out = metrics.bytes_out,
            "request complete"
        );
        Ok(ProcessedOutput { data, metrics })
    }

    fn execute_cached(
        &self,
        bytes: &[u8],
        pipeline: &Pipeline,
        label: &'static str,
        cache: &ProcessedImageCache,
    ) -> Result<ProcessedOutput> {
        let started = Instant::now();
        let key = CacheKey::new(self.operation_key(label, pipeline), bytes);

        if let Some(hit) = cache.get(&key) {
            let (width, height) = read_dimensions(&hit).unwrap_or((0, 0));
            let mut metrics = ProcessingMetrics {
                bytes_in: bytes.len() as u64,
                format_in: detect_format(bytes).map(format_name),
                format_out: self
                    .output_format_for(bytes)
                    .map(|f| f.as_str().to_string())
                    .unwrap_or_default(),
                width,
                height,
                cache_hit: true,
                ..ProcessingMetrics::default()
            };
            metrics.set_output_size(hit.len());
            metrics.total_ms = started.elapsed().as_secs_f64() * 1000.0;
            debug!(target: "manuscript_raster::api", request = label, "cache hit");
            return Ok(ProcessedOutput {
                data: hit.to_vec(),
                metrics,
            });
        }

        let output = self.execute(bytes, pipeline, label)?;
        cache.insert(key, output.data.clone());
        Ok(output)
    }

    /// Cache key for a request: the stage list with normalized parameters
    /// plus the encoder settings that shape the output bytes.
    fn operation_key(&self, label: &str, pipeline: &Pipeline) -> String {
        let stages: Vec<String> = pipeline
            .stages()
            .iter()
            .map(|s| s.operation().cache_key())
            .collect();
        let config = self.config();
        format!(
            "{label}[{}]q{}o{}",
            stages.join(","),
            config.jpeg_quality,
            config.optimize_png
        )
    }
}
