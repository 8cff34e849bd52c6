//! Image-text similarity scoring.
//!
//! The classifier only depends on [`SimilarityScorer`]: given an image and a
//! list of prompts, return one raw score per prompt, in order. [`ClipScorer`]
//! implements it with CLIP ViT-B/32 running locally via ONNX Runtime.
//!
//! # Usage
//!
//! ```rust,ignore
//! use attire_core::config::Config;
//! use attire_core::embedding::{ClipScorer, SimilarityScorer};
//!
//! let config = Config::default();
//! let scorer = ClipScorer::load(&config.model, &config.model_path())?;
//! let scores = scorer.score(&image, &["a red shirt".to_string()])?;
//! ```

pub(crate) mod preprocess;
pub(crate) mod text;
pub(crate) mod vision;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use image::DynamicImage;

use crate::config::ModelConfig;
use crate::error::PipelineError;

use self::preprocess::preprocess;
use self::text::ClipTextEncoder;
use self::vision::ClipVisionSession;

/// The vision encoder ONNX model filename.
pub const VISION_MODEL_FILENAME: &str = "vision_model.onnx";

/// The text encoder ONNX model filename.
pub const TEXT_MODEL_FILENAME: &str = "text_model.onnx";

/// The tokenizer filename.
pub const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// Files a CLIP model directory must contain.
pub const MODEL_FILES: [&str; 3] = [VISION_MODEL_FILENAME, TEXT_MODEL_FILENAME, TOKENIZER_FILENAME];

/// Scores how well each text prompt describes an image.
///
/// Implementations must return exactly one finite score per prompt, in
/// prompt order. Scores are only compared within one call, so any scale works
/// as long as higher means "more similar".
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, image: &DynamicImage, texts: &[String]) -> Result<Vec<f32>, PipelineError>;
}

/// CLIP-backed similarity scorer.
///
/// Prompt embeddings are cached: the prompt set is fixed by configuration, so
/// after the first image every text embedding is a cache hit.
pub struct ClipScorer {
    vision: ClipVisionSession,
    text: ClipTextEncoder,
    image_size: u32,
    logit_scale: f32,
    text_cache: RwLock<HashMap<String, Vec<f32>>>,
}

impl ClipScorer {
    /// Load the CLIP encoders from a model directory.
    ///
    /// Expects `vision_model.onnx`, `text_model.onnx` and `tokenizer.json`
    /// directly under `model_path`.
    pub fn load(config: &ModelConfig, model_path: &Path) -> Result<Self, PipelineError> {
        if let Some(missing) = Self::missing_files(model_path).first() {
            return Err(PipelineError::Model {
                message: format!(
                    "{} not found. Run `attire models download` first.",
                    missing.display()
                ),
            });
        }

        tracing::info!("Loading CLIP model from {:?}", model_path);
        let vision = ClipVisionSession::load(&model_path.join(VISION_MODEL_FILENAME))?;
        let text = ClipTextEncoder::load(
            &model_path.join(TEXT_MODEL_FILENAME),
            &model_path.join(TOKENIZER_FILENAME),
            config.max_text_length,
        )?;
        tracing::info!("CLIP model loaded successfully");

        Ok(Self {
            vision,
            text,
            image_size: config.image_size,
            logit_scale: config.logit_scale,
            text_cache: RwLock::new(HashMap::new()),
        })
    }

    /// Check whether all model files exist on disk.
    pub fn model_exists(model_path: &Path) -> bool {
        Self::missing_files(model_path).is_empty()
    }

    /// Model files that are not present under `model_path`.
    pub fn missing_files(model_path: &Path) -> Vec<PathBuf> {
        MODEL_FILES
            .iter()
            .map(|f| model_path.join(f))
            .filter(|p| !p.exists())
            .collect()
    }

    /// Text embeddings for `texts`, encoding only the cache misses.
    fn text_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let misses: Vec<String> = {
            let cache = self.text_cache.read().map_err(|e| PipelineError::Scoring {
                message: format!("Text cache lock poisoned: {e}"),
            })?;
            let mut seen = std::collections::HashSet::new();
            texts
                .iter()
                .filter(|t| !cache.contains_key(*t) && seen.insert(t.as_str()))
                .cloned()
                .collect()
        };

        if !misses.is_empty() {
            tracing::debug!("Encoding {} uncached prompts", misses.len());
            let encoded = self.text.encode_batch(&misses)?;
            let mut cache = self.text_cache.write().map_err(|e| PipelineError::Scoring {
                message: format!("Text cache lock poisoned: {e}"),
            })?;
            cache.extend(misses.into_iter().zip(encoded));
        }

        let cache = self.text_cache.read().map_err(|e| PipelineError::Scoring {
            message: format!("Text cache lock poisoned: {e}"),
        })?;
        texts
            .iter()
            .map(|t| {
                cache.get(t).cloned().ok_or_else(|| PipelineError::Scoring {
                    message: format!("No embedding for prompt {t:?}"),
                })
            })
            .collect()
    }
}

impl SimilarityScorer for ClipScorer {
    fn score(&self, image: &DynamicImage, texts: &[String]) -> Result<Vec<f32>, PipelineError> {
        let tensor = preprocess(image, self.image_size);
        let image_embedding = self.vision.embed(&tensor)?;
        let text_embeddings = self.text_embeddings(texts)?;
        similarity_logits(&image_embedding, &text_embeddings, self.logit_scale)
    }
}

/// CLIP logits: scaled cosine similarity of L2-normalized embeddings.
pub fn similarity_logits(
    image_embedding: &[f32],
    text_embeddings: &[Vec<f32>],
    logit_scale: f32,
) -> Result<Vec<f32>, PipelineError> {
    text_embeddings
        .iter()
        .map(|t| {
            if t.len() != image_embedding.len() {
                return Err(PipelineError::Scoring {
                    message: format!(
                        "Embedding dimension mismatch: image {} vs text {}",
                        image_embedding.len(),
                        t.len()
                    ),
                });
            }
            Ok(logit_scale * crate::math::dot(image_embedding, t))
        })
        .collect()
}
