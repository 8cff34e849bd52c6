//! Sub-configuration structs with defaults.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::types::Axis;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.attire/models"),
        }
    }
}

/// Input discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// File extensions picked up when classifying a directory
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            supported_formats: ["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Image normalization settings (crop-to-content, resize, pad-to-square).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Side length of the square canvas the garment is centered on
    pub output_size: u32,

    /// Pixels with alpha at or below this value count as background
    pub alpha_threshold: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            output_size: 512,
            alpha_threshold: 0,
        }
    }
}

/// Retry policy for the similarity scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Extra attempts after a scoring failure or timeout
    pub retry_attempts: u32,

    /// Base delay for exponential backoff in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 1,
            retry_delay_ms: 500,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Timeout for one similarity scorer call in milliseconds
    pub score_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
            score_timeout_ms: 30000,
        }
    }
}

/// CLIP model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model directory name under `general.model_dir`
    pub name: String,

    /// Hugging Face repository the ONNX exports are downloaded from
    pub repo: String,

    /// Vision encoder input size in pixels
    pub image_size: u32,

    /// Multiplier applied to cosine similarity (CLIP's learned logit scale)
    pub logit_scale: f32,

    /// Maximum prompt length in tokens
    pub max_text_length: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "clip-vit-base-patch32".to_string(),
            repo: "Xenova/clip-vit-base-patch32".to_string(),
            image_size: 224,
            logit_scale: 100.0,
            max_text_length: 77,
        }
    }
}

/// Vocabulary, prompt templates and threshold for one attribute axis.
///
/// Each template carries exactly one `{}` slot that receives a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Candidate answers, in tie-break order
    pub labels: Vec<String>,

    /// Phrasings, each with one `{}` slot
    pub templates: Vec<String>,

    /// Minimum arg-max probability for a confident verdict
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

fn default_threshold() -> f32 {
    0.5
}

impl AxisConfig {
    /// Build an axis from string slices.
    pub fn new(labels: &[&str], templates: &[&str], threshold: f32) -> Self {
        Self {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            templates: templates.iter().map(|s| s.to_string()).collect(),
            threshold,
        }
    }

    /// Number of prompts one classification of this axis scores.
    pub fn prompt_count(&self) -> usize {
        self.labels.len() * self.templates.len()
    }

    fn default_color() -> Self {
        Self::new(
            &[
                "black", "white", "gray", "red", "blue", "green", "yellow", "purple", "orange",
                "brown", "pink", "beige",
            ],
            &[
                "a clothing item that is {}",
                "a {} piece of clothing",
                "a product image showing a {} garment",
            ],
            0.5,
        )
    }

    fn default_pattern() -> Self {
        Self::new(
            &[
                "solid color",
                "plain",
                "striped",
                "plaid",
                "floral",
                "polka dot",
                "camouflage",
                "checkered",
                "animal print",
                "graphic print",
            ],
            &[
                "a piece of clothing with a {} pattern",
                "a {} pattern on a fashion item",
                "a product photo of a {} design",
            ],
            0.5,
        )
    }

    fn default_type() -> Self {
        Self::new(
            &[
                "t-shirt",
                "hoodie",
                "tank top",
                "long sleeve shirt",
                "short sleeve shirt",
                "dress",
                "skirt",
                "jeans",
                "shorts",
                "jacket",
                "coat",
                "blouse",
                "sweater",
                "sweatpants",
                "long sleeve polo shirt",
                "short sleeve polo shirt",
            ],
            &[
                "a flat-lay image of a {} on a bed",
                "a clothing catalog photo of a {}",
                "a product photo of a {} against a white background",
            ],
            0.5,
        )
    }
}

/// Per-axis classification settings.
///
/// An `[axes.*]` table only needs the keys it changes; the rest come from
/// that axis's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesConfig {
    #[serde(deserialize_with = "color_axis")]
    pub color: AxisConfig,
    #[serde(deserialize_with = "pattern_axis")]
    pub pattern: AxisConfig,
    #[serde(rename = "type", deserialize_with = "type_axis")]
    pub garment_type: AxisConfig,
}

/// An `[axes.*]` table as written, before defaults are filled in.
#[derive(Debug, Deserialize)]
struct AxisOverrides {
    labels: Option<Vec<String>>,
    templates: Option<Vec<String>>,
    threshold: Option<f32>,
}

impl AxisOverrides {
    fn apply(self, base: AxisConfig) -> AxisConfig {
        AxisConfig {
            labels: self.labels.unwrap_or(base.labels),
            templates: self.templates.unwrap_or(base.templates),
            threshold: self.threshold.unwrap_or(base.threshold),
        }
    }
}

fn color_axis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AxisConfig, D::Error> {
    Ok(AxisOverrides::deserialize(deserializer)?.apply(AxisConfig::default_color()))
}

fn pattern_axis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AxisConfig, D::Error> {
    Ok(AxisOverrides::deserialize(deserializer)?.apply(AxisConfig::default_pattern()))
}

fn type_axis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AxisConfig, D::Error> {
    Ok(AxisOverrides::deserialize(deserializer)?.apply(AxisConfig::default_type()))
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            color: AxisConfig::default_color(),
            pattern: AxisConfig::default_pattern(),
            garment_type: AxisConfig::default_type(),
        }
    }
}

impl AxesConfig {
    /// Settings for a given axis.
    pub fn get(&self, axis: Axis) -> &AxisConfig {
        match axis {
            Axis::Color => &self.color,
            Axis::Pattern => &self.pattern,
            Axis::Type => &self.garment_type,
        }
    }

    /// Mutable settings for a given axis.
    pub fn get_mut(&mut self, axis: Axis) -> &mut AxisConfig {
        match axis {
            Axis::Color => &mut self.color,
            Axis::Pattern => &mut self.pattern,
            Axis::Type => &mut self.garment_type,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,

    /// Embed the normalized image (base64 PNG) in each record
    pub include_image: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: true,
            include_image: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
