// src/error.rs
//
// Unified error handling for manuscript-raster
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - UserError: Invalid input, recoverable
// - CodecError: Format/encoding issues
// - ResourceLimit: Memory/dimension limits, unreadable files
// - InternalBug: Library bugs (should not happen)
//
// The transform algorithms themselves have no error path. Everything here is
// raised at the codec boundary, while loading configuration, or when a stage
// dies unexpectedly.

use std::borrow::Cow;
use thiserror::Error;

/// Error taxonomy used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Invalid input, recoverable by user
    UserError,
    /// Format/encoding issues
    CodecError,
    /// Memory/dimension limits
    ResourceLimit,
    /// Library bugs (should not happen)
    InternalBug,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "UserError",
            ErrorCategory::CodecError => "CodecError",
            ErrorCategory::ResourceLimit => "ResourceLimit",
            ErrorCategory::InternalBug => "InternalBug",
        }
    }
}

/// Where in a request the failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Decode,
    Pipeline,
    Encode,
    Config,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Decode => "decode",
            FailureStage::Pipeline => "pipeline",
            FailureStage::Encode => "encode",
            FailureStage::Config => "config",
        }
    }
}

/// manuscript-raster error types
#[derive(Debug, Error)]
pub enum RasterError {
    // Decode Errors
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: Cow<'static, str> },

    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    // Size Limit Errors
    #[error("Image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    // Encode Errors
    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Configuration Errors
    #[error("Failed to read configuration file '{path}': {source}")]
    ConfigRead {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: Cow<'static, str> },

    // Internal Errors
    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },
}

impl Clone for RasterError {
    fn clone(&self) -> Self {
        match self {
            Self::UnsupportedFormat { format } => Self::UnsupportedFormat {
                format: format.clone(),
            },
            Self::DecodeFailed { message } => Self::DecodeFailed {
                message: message.clone(),
            },
            Self::DimensionExceedsLimit { dimension, max } => Self::DimensionExceedsLimit {
                dimension: *dimension,
                max: *max,
            },
            Self::PixelCountExceedsLimit { pixels, max } => Self::PixelCountExceedsLimit {
                pixels: *pixels,
                max: *max,
            },
            Self::EncodeFailed { format, message } => Self::EncodeFailed {
                format: format.clone(),
                message: message.clone(),
            },
            Self::ConfigRead { path, source } => Self::ConfigRead {
                path: path.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            Self::ConfigParse { message } => Self::ConfigParse {
                message: message.clone(),
            },
            Self::InternalPanic { message } => Self::InternalPanic {
                message: message.clone(),
            },
        }
    }
}

// Constructor Helpers
impl RasterError {
    pub fn unsupported_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn config_read(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::ConfigRead {
            path: path.into(),
            source,
        }
    }

    pub fn config_parse(message: impl Into<Cow<'static, str>>) -> Self {
        Self::ConfigParse {
            message: message.into(),
        }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (user can fix it)
    ///
    /// Consistent with category(): UserError and ResourceLimit are recoverable,
    /// CodecError and InternalBug are not.
    pub fn is_recoverable(&self) -> bool {
        match self.category() {
            ErrorCategory::UserError | ErrorCategory::ResourceLimit => true,
            ErrorCategory::CodecError | ErrorCategory::InternalBug => false,
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigParse { .. } => ErrorCategory::UserError,

            Self::UnsupportedFormat { .. }
            | Self::DecodeFailed { .. }
            | Self::EncodeFailed { .. } => ErrorCategory::CodecError,

            // ConfigRead sits here with the other I/O-ish failures: the caller
            // can fix permissions or paths and try again.
            Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. }
            | Self::ConfigRead { .. } => ErrorCategory::ResourceLimit,

            Self::InternalPanic { .. } => ErrorCategory::InternalBug,
        }
    }

    /// The request stage that produced this error.
    pub fn stage(&self) -> FailureStage {
        match self {
            Self::UnsupportedFormat { .. }
            | Self::DecodeFailed { .. }
            | Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. } => FailureStage::Decode,
            Self::EncodeFailed { .. } => FailureStage::Encode,
            Self::ConfigRead { .. } | Self::ConfigParse { .. } => FailureStage::Config,
            Self::InternalPanic { .. } => FailureStage::Pipeline,
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, RasterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RasterError::unsupported_format("gif");
        assert!(err.to_string().contains("gif"));

        let err = RasterError::encode_failed("jpeg", "writer closed");
        assert_eq!(err.to_string(), "Failed to encode as jpeg: writer closed");
    }

    #[test]
    fn test_error_recoverable() {
        assert!(RasterError::config_parse("expected value").is_recoverable());
        assert!(RasterError::dimension_exceeds_limit(40000, 32768).is_recoverable());
        assert!(!RasterError::decode_failed("test").is_recoverable());
        assert!(!RasterError::internal_panic("test").is_recoverable());
    }

    #[test]
    fn test_error_category_codec_error() {
        assert_eq!(
            RasterError::unsupported_format("gif").category(),
            ErrorCategory::CodecError
        );
        assert_eq!(
            RasterError::decode_failed("test").category(),
            ErrorCategory::CodecError
        );
        assert_eq!(
            RasterError::encode_failed("png", "test").category(),
            ErrorCategory::CodecError
        );
    }

    #[test]
    fn test_error_category_resource_limit() {
        assert_eq!(
            RasterError::pixel_count_exceeds_limit(1_000_000_000, 100_000_000).category(),
            ErrorCategory::ResourceLimit
        );
        assert_eq!(
            RasterError::config_read(
                "config.json",
                std::io::Error::from(std::io::ErrorKind::PermissionDenied)
            )
            .category(),
            ErrorCategory::ResourceLimit
        );
    }

    #[test]
    fn test_failure_stage_names_offending_step() {
        assert_eq!(RasterError::decode_failed("x").stage(), FailureStage::Decode);
        assert_eq!(
            RasterError::unsupported_format("bmp").stage(),
            FailureStage::Decode
        );
        assert_eq!(
            RasterError::encode_failed("png", "x").stage(),
            FailureStage::Encode
        );
        assert_eq!(RasterError::config_parse("x").stage(), FailureStage::Config);
        assert_eq!(
            RasterError::internal_panic("stage 2").stage(),
            FailureStage::Pipeline
        );
        assert_eq!(FailureStage::Encode.as_str(), "encode");
    }

    #[test]
    fn test_clone_preserves_io_source_kind() {
        let err = RasterError::config_read(
            "missing.json",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        match err.clone() {
            RasterError::ConfigRead { path, source } => {
                assert_eq!(path, "missing.json");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected clone: {other:?}"),
        }
    }
}
