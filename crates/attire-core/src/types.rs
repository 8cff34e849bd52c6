//! Core data types for the Attire classification pipeline.
//!
//! These types represent the verdicts produced for one garment image and the
//! records written by the output layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Sentinel verdict for a confident-low-score outcome.
pub const UNCERTAIN: &str = "uncertain";

/// One independent attribute dimension being classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Color,
    Pattern,
    Type,
}

impl Axis {
    /// All axes in output order.
    pub const ALL: [Axis; 3] = [Axis::Color, Axis::Pattern, Axis::Type];

    /// Lowercase name used in config keys and output fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Color => "color",
            Axis::Pattern => "pattern",
            Axis::Type => "type",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decision for one axis: a vocabulary label or "uncertain".
///
/// Serialized as a bare string so the output stays flat:
/// `"red"` or `"uncertain"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verdict {
    Label(String),
    Uncertain,
}

impl Verdict {
    /// The chosen label, if the verdict is confident.
    pub fn label(&self) -> Option<&str> {
        match self {
            Verdict::Label(label) => Some(label),
            Verdict::Uncertain => None,
        }
    }

    /// Whether the model fell below the axis threshold.
    pub fn is_uncertain(&self) -> bool {
        matches!(self, Verdict::Uncertain)
    }
}

impl From<String> for Verdict {
    fn from(s: String) -> Self {
        if s == UNCERTAIN {
            Verdict::Uncertain
        } else {
            Verdict::Label(s)
        }
    }
}

impl From<Verdict> for String {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::Label(label) => label,
            Verdict::Uncertain => UNCERTAIN.to_string(),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Label(label) => f.write_str(label),
            Verdict::Uncertain => f.write_str(UNCERTAIN),
        }
    }
}

/// What one axis produced: a verdict, or a pipeline fault.
///
/// A fault is never folded into "uncertain". It serializes as
/// `{"error": "..."}` in place of the verdict string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisOutcome {
    Verdict(Verdict),
    Failed { error: String },
}

impl AxisOutcome {
    /// The verdict, unless the axis failed.
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            AxisOutcome::Verdict(v) => Some(v),
            AxisOutcome::Failed { .. } => None,
        }
    }

    /// Whether the axis failed to produce a verdict.
    pub fn is_failed(&self) -> bool {
        matches!(self, AxisOutcome::Failed { .. })
    }
}

/// One verdict per attribute axis. The terminal output of classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub color: AxisOutcome,
    pub pattern: AxisOutcome,
    #[serde(rename = "type")]
    pub garment_type: AxisOutcome,
}

impl ClassificationResult {
    /// Outcome for a given axis.
    pub fn get(&self, axis: Axis) -> &AxisOutcome {
        match axis {
            Axis::Color => &self.color,
            Axis::Pattern => &self.pattern,
            Axis::Type => &self.garment_type,
        }
    }

    /// Number of axes that failed with a pipeline fault.
    pub fn failed_axes(&self) -> usize {
        Axis::ALL
            .iter()
            .filter(|axis| self.get(**axis).is_failed())
            .count()
    }
}

/// Probability assigned to one label after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelProbability {
    pub label: String,
    pub probability: f64,
}

/// Detailed view of one axis decision, emitted with `--explain`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisReport {
    pub axis: Axis,
    pub verdict: Verdict,

    /// Probability of the arg-max label (whether or not it cleared the threshold)
    pub confidence: f64,

    /// Threshold the confidence was compared against
    pub threshold: f32,

    /// Per-label probabilities, in vocabulary order
    pub distribution: Vec<LabelProbability>,
}

/// The complete output for one classified garment image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedImage {
    /// Path to the source file
    pub file_path: PathBuf,

    /// Just the filename portion
    pub file_name: String,

    /// Per-axis verdicts
    pub prediction: ClassificationResult,

    /// Per-axis probability breakdown (successful axes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<AxisReport>>,

    /// Base64-encoded PNG of the normalized image that was scored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_image: Option<String>,
}

/// Statistics for a directory run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProcessingStats {
    /// Images classified (possibly with some failed axes)
    pub succeeded: usize,

    /// Images that could not be preprocessed
    pub failed: usize,

    /// Individual axis failures across all succeeded images
    pub axis_failures: usize,

    /// Total processing time in seconds
    pub total_seconds: f64,
}

impl ProcessingStats {
    /// Images per second over the whole run.
    pub fn rate(&self) -> f64 {
        if self.total_seconds > 0.0 {
            (self.succeeded + self.failed) as f64 / self.total_seconds
        } else {
            0.0
        }
    }
}
