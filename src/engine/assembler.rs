// src/engine/assembler.rs
//
// Builds pipelines from configuration and ad-hoc requests.
//
// Algorithms that only depend on the configuration (including the default
// gaussian kernel) are built once here and cloned into each pipeline.

use super::algorithms::Algorithm;
use super::executor::ExecutionOptions;
use super::pipeline::Pipeline;
use crate::config::ProcessingConfig;
use crate::ops::{is_quarter_turn, Operation, TransformRequest};
use tracing::debug;

/// Highest denoise level that still selects the box blur.
pub const BOX_BLUR_MAX_DENOISE: i32 = 3;

#[derive(Clone, Debug)]
pub struct PipelineAssembler {
    config: ProcessingConfig,
    exec: ExecutionOptions,
    grayscale: Algorithm,
    sobel: Algorithm,
    box_blur: Algorithm,
    gaussian_blur: Algorithm,
    flip: Algorithm,
}

impl PipelineAssembler {
    pub fn new(config: &ProcessingConfig) -> Self {
        let exec = config.execution_options();
        let build = |op: Operation| Algorithm::from_operation(&op, exec);
        Self {
            grayscale: build(Operation::Grayscale),
            sobel: build(Operation::EdgeDetect {
                threshold: config.sobel_threshold,
            }),
            box_blur: build(Operation::BoxBlur {
                size: config.box_blur_size,
            }),
            gaussian_blur: build(Operation::GaussianBlur {
                sigma: config.gaussian_blur_sigma,
                size: config.gaussian_blur_size,
            }),
            flip: build(Operation::FlipVertical),
            config: config.clone(),
            exec,
        }
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn execution_options(&self) -> &ExecutionOptions {
        &self.exec
    }

    /// OCR preprocessing: grayscale, then edge enhancement when enabled, then
    /// denoising chosen by level.
    pub fn for_ocr(&self) -> Pipeline {
        let mut pipeline = Pipeline::new();
        pipeline.push(self.grayscale.clone());

        if self.config.enhancement_enabled {
            pipeline.push(self.sobel.clone());
        }

        match self.config.denoise_level {
            level if level <= 0 => {}
            level if level <= BOX_BLUR_MAX_DENOISE => pipeline.push(self.box_blur.clone()),
            _ => pipeline.push(self.gaussian_blur.clone()),
        }

        debug!(
            target: "manuscript_raster::assembler",
            stages = ?pipeline.names(),
            denoise_level = self.config.denoise_level,
            "assembled ocr pipeline"
        );
        pipeline
    }

    /// Ad-hoc transforms, always in the order flip, rotate, grayscale, box
    /// blur, gaussian blur, edge detection.
    pub fn for_request(&self, request: &TransformRequest) -> Pipeline {
        let mut pipeline = Pipeline::new();

        if request.upside_down {
            pipeline.push(self.flip.clone());
        }

        if let Some(degrees) = request.rotation_angle {
            let op = if is_quarter_turn(degrees) {
                Operation::ShearRotate { degrees }
            } else {
                Operation::Rotate { degrees }
            };
            pipeline.push(self.build(op));
        }

        if request.grayscale {
            pipeline.push(self.grayscale.clone());
        }

        if request.box_blur {
            pipeline.push(match request.box_blur_size {
                Some(size) => self.build(Operation::BoxBlur { size }),
                None => self.box_blur.clone(),
            });
        }

        if request.gaussian_blur {
            pipeline.push(
                match (request.gaussian_blur_sigma, request.gaussian_blur_size) {
                    (None, None) => self.gaussian_blur.clone(),
                    (sigma, size) => self.build(Operation::GaussianBlur {
                        sigma: sigma.unwrap_or(self.config.gaussian_blur_sigma),
                        size: size.unwrap_or(self.config.gaussian_blur_size),
                    }),
                },
            );
        }

        if request.edge_detection {
            pipeline.push(match request.edge_threshold {
                Some(threshold) => self.build(Operation::EdgeDetect { threshold }),
                None => self.sobel.clone(),
            });
        }

        debug!(
            target: "manuscript_raster::assembler",
            stages = ?pipeline.names(),
            "assembled request pipeline"
        );
        pipeline
    }

    fn build(&self, op: Operation) -> Algorithm {
        Algorithm::from_operation(&op, self.exec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(denoise_level: i32, enhancement_enabled: bool) -> ProcessingConfig {
        ProcessingConfig {
            denoise_level,
            enhancement_enabled,
            ..ProcessingConfig::default()
        }
    }

    #[test]
    fn ocr_denoise_selection() {
        let names = |level| PipelineAssembler::new(&config(level, true)).for_ocr().names();
        assert_eq!(names(2), vec!["Grayscale", "Sobel Edge Detection", "Box Blur"]);
        assert_eq!(names(3), vec!["Grayscale", "Sobel Edge Detection", "Box Blur"]);
        assert_eq!(names(5), vec!["Grayscale", "Sobel Edge Detection", "Gaussian Blur"]);
        assert_eq!(names(0), vec!["Grayscale", "Sobel Edge Detection"]);
        assert_eq!(names(-1), vec!["Grayscale", "Sobel Edge Detection"]);
    }

    #[test]
    fn ocr_without_enhancement() {
        let pipeline = PipelineAssembler::new(&config(0, false)).for_ocr();
        assert_eq!(pipeline.names(), vec!["Grayscale"]);
    }

    #[test]
    fn request_order_is_fixed() {
        let assembler = PipelineAssembler::new(&ProcessingConfig::default());
        let request = TransformRequest {
            edge_detection: true,
            gaussian_blur: true,
            box_blur: true,
            grayscale: true,
            rotation_angle: Some(30.0),
            upside_down: true,
            ..TransformRequest::default()
        };
        assert_eq!(
            assembler.for_request(&request).names(),
            vec![
                "Upside Down",
                "Rotate",
                "Grayscale",
                "Box Blur",
                "Gaussian Blur",
                "Sobel Edge Detection"
            ]
        );
    }

    #[test]
    fn quarter_turns_use_shear_rotation() {
        let assembler = PipelineAssembler::new(&ProcessingConfig::default());
        for (angle, expected) in [
            (90.0, "Shear Rotate"),
            (180.0, "Shear Rotate"),
            (-270.0, "Shear Rotate"),
            (45.0, "Rotate"),
            (0.0, "Rotate"),
        ] {
            let request = TransformRequest {
                rotation_angle: Some(angle),
                ..TransformRequest::default()
            };
            assert_eq!(assembler.for_request(&request).names(), vec![expected]);
        }
    }

    #[test]
    fn overrides_replace_config_defaults() {
        let assembler = PipelineAssembler::new(&ProcessingConfig::default());
        let request = TransformRequest {
            box_blur: true,
            box_blur_size: Some(6),
            gaussian_blur: true,
            gaussian_blur_sigma: Some(2.0),
            edge_detection: true,
            edge_threshold: Some(12),
            ..TransformRequest::default()
        };
        let ops: Vec<_> = assembler
            .for_request(&request)
            .stages()
            .iter()
            .map(Algorithm::operation)
            .collect();
        assert_eq!(
            ops,
            vec![
                Operation::BoxBlur { size: 7 },
                Operation::GaussianBlur {
                    sigma: 2.0,
                    size: 5
                },
                Operation::EdgeDetect { threshold: 12 },
            ]
        );
    }

    #[test]
    fn empty_request_builds_empty_pipeline() {
        let assembler = PipelineAssembler::new(&ProcessingConfig::default());
        assert!(assembler.for_request(&TransformRequest::default()).is_empty());
    }
}
