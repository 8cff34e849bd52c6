//! Zero-shot attribute classification.
//!
//! Prompts are expanded per axis, scored against the image by a
//! [`SimilarityScorer`](crate::embedding::SimilarityScorer), averaged per label,
//! softmaxed and thresholded into a verdict.

pub mod aggregate;
pub mod classifier;
pub mod prompts;
pub mod retry;

pub use classifier::{AttributeClassifier, Classification, ScoringPolicy};
pub use prompts::{expand, PromptPair};
