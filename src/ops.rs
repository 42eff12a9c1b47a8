// src/ops.rs
//
// Transform descriptors.
// These are cheap to create and store - the expensive work (kernel generation,
// pixel loops) happens once the engine turns them into algorithms.

use bitflags::bitflags;
use image::ImageFormat;
use serde_json::{Map, Value};
use tracing::warn;

/// Pixel transforms the pipeline knows how to run.
///
/// Parameters are stored as given; normalization (odd kernel sizes, positive
/// sigma) happens when the engine builds the algorithm.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    /// Luma conversion with 0.299/0.587/0.114 weights
    Grayscale,

    /// Mean filter over a square neighborhood
    BoxBlur { size: i32 },

    /// Normalized gaussian convolution
    GaussianBlur { sigma: f64, size: i32 },

    /// Sobel gradient magnitude, thresholded to 0/255
    EdgeDetect { threshold: u8 },

    /// Arbitrary-angle rotation on an expanded canvas
    Rotate { degrees: f64 },

    /// Three-shear rotation on the input canvas
    ShearRotate { degrees: f64 },

    /// Mirror rows top to bottom
    FlipVertical,
}

bitflags! {
    /// Input state an operation expects.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct OperationRequirement: u8 {
        /// Needs single-channel input; satisfied internally when missing.
        const GRAYSCALE_INPUT = 1 << 0;
    }
}

bitflags! {
    /// What an operation does to the buffer it produces.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct OperationEffect: u8 {
        const PRODUCES_LUMA = 1 << 0;
        const PRODUCES_RGBA = 1 << 1;
        const PRESERVES_LAYOUT = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperationContract {
    pub name: &'static str,
    pub requires: OperationRequirement,
    pub effects: OperationEffect,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        self.contract().name
    }

    pub fn contract(&self) -> OperationContract {
        let (name, requires, effects) = match self {
            Operation::Grayscale => (
                "Grayscale",
                OperationRequirement::empty(),
                OperationEffect::PRODUCES_LUMA,
            ),
            Operation::BoxBlur { .. } => (
                "Box Blur",
                OperationRequirement::empty(),
                OperationEffect::PRODUCES_RGBA,
            ),
            Operation::GaussianBlur { .. } => (
                "Gaussian Blur",
                OperationRequirement::empty(),
                OperationEffect::PRODUCES_RGBA,
            ),
            Operation::EdgeDetect { .. } => (
                "Sobel Edge Detection",
                OperationRequirement::GRAYSCALE_INPUT,
                OperationEffect::PRODUCES_LUMA,
            ),
            Operation::Rotate { .. } => (
                "Rotate",
                OperationRequirement::empty(),
                OperationEffect::PRODUCES_RGBA,
            ),
            Operation::ShearRotate { .. } => (
                "Shear Rotate",
                OperationRequirement::empty(),
                OperationEffect::PRODUCES_RGBA,
            ),
            Operation::FlipVertical => (
                "Upside Down",
                OperationRequirement::empty(),
                OperationEffect::PRESERVES_LAYOUT,
            ),
        };
        OperationContract {
            name,
            requires,
            effects,
        }
    }

    /// Stable textual key, used for cache lookups and logging.
    pub fn cache_key(&self) -> String {
        match self {
            Operation::Grayscale => "grayscale".to_string(),
            Operation::BoxBlur { size } => format!("box_blur:{size}"),
            Operation::GaussianBlur { sigma, size } => format!("gaussian_blur:{sigma}:{size}"),
            Operation::EdgeDetect { threshold } => format!("sobel:{threshold}"),
            Operation::Rotate { degrees } => format!("rotate:{degrees}"),
            Operation::ShearRotate { degrees } => format!("shear_rotate:{degrees}"),
            Operation::FlipVertical => "flip_v".to_string(),
        }
    }
}

/// True for non-zero exact multiples of 90 degrees.
pub fn is_quarter_turn(degrees: f64) -> bool {
    degrees.is_finite() && degrees != 0.0 && degrees % 90.0 == 0.0
}

/// Ad-hoc transformation request.
///
/// Built from the loosely typed key/value map that request handlers receive.
/// A flag only counts when it is boolean `true`; overrides that are absent or
/// of the wrong type fall back to the configured defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformRequest {
    pub upside_down: bool,
    pub rotation_angle: Option<f64>,
    pub grayscale: bool,
    pub box_blur: bool,
    pub box_blur_size: Option<i32>,
    pub gaussian_blur: bool,
    pub gaussian_blur_sigma: Option<f64>,
    pub gaussian_blur_size: Option<i32>,
    pub edge_detection: bool,
    pub edge_threshold: Option<u8>,
}

impl TransformRequest {
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            upside_down: flag(map, "upsideDown"),
            rotation_angle: number(map, "rotationAngle"),
            grayscale: flag(map, "grayscale"),
            box_blur: flag(map, "boxBlur"),
            box_blur_size: integer(map, "boxBlurSize"),
            gaussian_blur: flag(map, "gaussianBlur"),
            gaussian_blur_sigma: number(map, "gaussianBlurSigma"),
            gaussian_blur_size: integer(map, "gaussianBlurSize"),
            edge_detection: flag(map, "edgeDetection"),
            edge_threshold: integer(map, "edgeThreshold")
                .map(|t| t.clamp(0, u8::MAX as i32) as u8),
        }
    }

    /// Whether the request asks for any transform at all.
    pub fn is_empty(&self) -> bool {
        !self.upside_down
            && self.rotation_angle.is_none()
            && !self.grayscale
            && !self.box_blur
            && !self.gaussian_blur
            && !self.edge_detection
    }
}

fn flag(map: &Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        None => false,
        Some(Value::Bool(enabled)) => *enabled,
        Some(other) => {
            warn!(key, value = %other, "ignoring non-boolean transform flag");
            false
        }
    }
}

fn number(map: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = map.get(key)?;
    match value.as_f64().filter(|v| v.is_finite()) {
        Some(v) => Some(v),
        None => {
            warn!(key, value = %value, "ignoring non-numeric transform value");
            None
        }
    }
}

fn integer(map: &Map<String, Value>, key: &str) -> Option<i32> {
    let value = map.get(key)?;
    let parsed = value
        .as_i64()
        .or_else(|| value.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64));
    match parsed {
        Some(v) => Some(v.clamp(i32::MIN as i64, i32::MAX as i64) as i32),
        None => {
            warn!(key, value = %value, "ignoring non-integer transform value");
            None
        }
    }
}

/// Output format for encoding. Only the input's own format is ever produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg { quality: u8 },
    Png { optimize: bool },
}

impl OutputFormat {
    /// Map a sniffed input format onto the encode set.
    pub fn for_input(format: ImageFormat, jpeg_quality: u8, optimize_png: bool) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg {
                quality: jpeg_quality.clamp(1, 100),
            }),
            ImageFormat::Png => Some(Self::Png {
                optimize: optimize_png,
            }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg { .. } => "jpeg",
            Self::Png { .. } => "png",
        }
    }
}
