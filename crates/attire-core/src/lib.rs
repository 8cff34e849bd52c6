//! Attire Core - zero-shot garment attribute classification.
//!
//! Attire takes a product photo of a single garment and infers its color,
//! pattern and type with CLIP, without any attribute-specific training.
//!
//! # Architecture
//!
//! ```text
//! Image → Normalize → ┬─ color   ─┐
//!                     ├─ pattern ─┼→ { color, pattern, type } → JSON
//!                     └─ type    ─┘
//! ```
//!
//! Each axis expands its label vocabulary into prompts, scores every prompt
//! against the image, averages per label, applies softmax and keeps the best
//! label only if it clears the axis threshold.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use attire_core::{AttributeClassifier, ClipScorer, Config, GarmentProcessor};
//!
//! #[tokio::main]
//! async fn main() -> attire_core::Result<()> {
//!     let config = Config::load()?;
//!     let scorer = Arc::new(ClipScorer::load(&config.model, &config.model_path())?);
//!     let classifier = AttributeClassifier::from_config(scorer, &config)?;
//!     let processor = GarmentProcessor::new(&config, classifier);
//!
//!     let record = processor.process("./shirt.png".as_ref()).await?;
//!     println!("{}", serde_json::to_string(&record.prediction)?);
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod config;
pub mod embedding;
pub mod error;
pub mod math;
pub mod output;
pub mod pipeline;
pub mod types;

pub use classify::{AttributeClassifier, Classification, ScoringPolicy};
pub use config::Config;
pub use embedding::{ClipScorer, SimilarityScorer};
pub use error::{AttireError, ConfigError, PipelineError, PipelineResult, Result};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{GarmentProcessor, ImageNormalizer, Preprocessor, ProcessOptions};
pub use types::{
    Axis, AxisOutcome, AxisReport, ClassificationResult, ClassifiedImage, ProcessingStats,
    Verdict,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
