//! Error types for the Attire classification pipeline.
//!
//! Errors are organized by stage: configuration problems are fatal at startup,
//! preprocessing problems belong to one input file, and scoring/aggregation
//! problems belong to one attribute axis of one image.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::Axis;

/// Top-level error type for Attire operations.
#[derive(Error, Debug)]
pub enum AttireError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
///
/// Malformed vocabularies, templates and thresholds all land in
/// `ValidationError`; none of them are recoverable per call.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input image could not be turned into a scoreable image
    #[error("Preprocessing failed for {path}: {message}")]
    Preprocess { path: PathBuf, message: String },

    /// The similarity backend failed
    #[error("Scoring failed: {message}")]
    Scoring { message: String },

    /// Raw scores violated the prompt/score contract
    #[error("Aggregation failed on {axis} axis: {message}")]
    Aggregation { axis: Axis, message: String },

    /// Model files missing or unloadable
    #[error("Model error: {message}")]
    Model { message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

impl PipelineError {
    /// Whether this error came from turning a file into a normalized image.
    pub fn is_preprocessing(&self) -> bool {
        match self {
            Self::Preprocess { .. }
            | Self::FileTooLarge { .. }
            | Self::ImageTooLarge { .. }
            | Self::UnsupportedFormat { .. }
            | Self::FileNotFound(_) => true,
            Self::Timeout { stage, .. } => stage == "decode",
            _ => false,
        }
    }
}

/// Convenience type alias for Attire results.
pub type Result<T> = std::result::Result<T, AttireError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
