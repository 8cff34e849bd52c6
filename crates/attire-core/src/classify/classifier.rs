//! Attribute classifier: one image in, one verdict per axis out.
//!
//! Each axis is independent. The three axes are scored concurrently and a
//! fault on one of them is recorded in its slot without touching the others.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use tokio::time::timeout;

use crate::config::{validate_axis, AxesConfig, AxisConfig, Config};
use crate::embedding::SimilarityScorer;
use crate::error::{AttireError, PipelineError};
use crate::types::{Axis, AxisOutcome, AxisReport, ClassificationResult};

use super::aggregate;
use super::prompts::{expand, PromptPair};
use super::retry::{backoff_duration, is_retryable};

/// Timeout and retry settings for scorer calls.
#[derive(Debug, Clone)]
pub struct ScoringPolicy {
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl ScoringPolicy {
    /// Policy from `[limits]` and `[pipeline]`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout_ms: config.limits.score_timeout_ms,
            retry_attempts: config.pipeline.retry_attempts,
            retry_delay_ms: config.pipeline.retry_delay_ms,
        }
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// An axis with its prompts expanded once up front.
struct PreparedAxis {
    axis: Axis,
    config: AxisConfig,
    pairs: Vec<PromptPair>,
    texts: Arc<Vec<String>>,
}

impl PreparedAxis {
    fn new(axis: Axis, config: &AxisConfig) -> Result<Self, AttireError> {
        validate_axis(axis, config)?;
        let pairs = expand(&config.labels, &config.templates)?;
        let texts = Arc::new(pairs.iter().map(|p| p.text.clone()).collect());
        Ok(Self {
            axis,
            config: config.clone(),
            pairs,
            texts,
        })
    }
}

/// Verdicts plus the per-axis breakdown behind them.
#[derive(Debug, Clone)]
pub struct Classification {
    pub result: ClassificationResult,

    /// Reports for the axes that produced a verdict, in axis order
    pub reports: Vec<AxisReport>,
}

/// Zero-shot classifier for garment color, pattern and type.
pub struct AttributeClassifier {
    scorer: Arc<dyn SimilarityScorer>,
    axes: [PreparedAxis; 3],
    policy: ScoringPolicy,
}

impl AttributeClassifier {
    /// Build a classifier, validating every axis configuration.
    pub fn new(
        scorer: Arc<dyn SimilarityScorer>,
        axes: &AxesConfig,
        policy: ScoringPolicy,
    ) -> Result<Self, AttireError> {
        let axes = [
            PreparedAxis::new(Axis::Color, &axes.color)?,
            PreparedAxis::new(Axis::Pattern, &axes.pattern)?,
            PreparedAxis::new(Axis::Type, &axes.garment_type)?,
        ];
        tracing::debug!(
            "Prepared {} color, {} pattern and {} type prompts",
            axes[0].pairs.len(),
            axes[1].pairs.len(),
            axes[2].pairs.len()
        );
        Ok(Self {
            scorer,
            axes,
            policy,
        })
    }

    /// Build a classifier from the `[axes]`, `[limits]` and `[pipeline]` sections.
    pub fn from_config(
        scorer: Arc<dyn SimilarityScorer>,
        config: &Config,
    ) -> Result<Self, AttireError> {
        Self::new(scorer, &config.axes, ScoringPolicy::from_config(config))
    }

    /// Classify a normalized image on all three axes.
    pub async fn classify(&self, image: Arc<DynamicImage>) -> ClassificationResult {
        self.classify_detailed(image, Path::new("<image>"))
            .await
            .result
    }

    /// Classify a normalized image, keeping per-axis reports.
    ///
    /// `source` is only used to label log lines and timeout errors.
    pub async fn classify_detailed(
        &self,
        image: Arc<DynamicImage>,
        source: &Path,
    ) -> Classification {
        let [color, pattern, garment_type] = &self.axes;
        let (color, pattern, garment_type) = tokio::join!(
            self.classify_axis(color, image.clone(), source),
            self.classify_axis(pattern, image.clone(), source),
            self.classify_axis(garment_type, image, source),
        );

        let mut reports = Vec::with_capacity(3);
        let mut outcome = |axis: Axis, result: Result<AxisReport, AttireError>| match result {
            Ok(report) => {
                let verdict = AxisOutcome::Verdict(report.verdict.clone());
                reports.push(report);
                verdict
            }
            Err(e) => {
                tracing::error!(axis = %axis, "Classification failed for {:?}: {e}", source);
                AxisOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let result = ClassificationResult {
            color: outcome(Axis::Color, color),
            pattern: outcome(Axis::Pattern, pattern),
            garment_type: outcome(Axis::Type, garment_type),
        };
        Classification { result, reports }
    }

    /// Score and aggregate one axis.
    async fn classify_axis(
        &self,
        prepared: &PreparedAxis,
        image: Arc<DynamicImage>,
        source: &Path,
    ) -> Result<AxisReport, AttireError> {
        let scores = self
            .score_with_retry(prepared.axis, image, prepared.texts.clone(), source)
            .await?;
        aggregate::aggregate(
            prepared.axis,
            &prepared.config.labels,
            prepared.config.templates.len(),
            &prepared.pairs,
            &scores,
            prepared.config.threshold,
        )
    }

    async fn score_with_retry(
        &self,
        axis: Axis,
        image: Arc<DynamicImage>,
        texts: Arc<Vec<String>>,
        source: &Path,
    ) -> Result<Vec<f32>, PipelineError> {
        let mut attempt = 0;
        loop {
            match self.score_once(image.clone(), texts.clone(), source).await {
                Ok(scores) => return Ok(scores),
                Err(e) if attempt < self.policy.retry_attempts && is_retryable(&e) => {
                    let delay = backoff_duration(attempt, self.policy.retry_delay_ms);
                    tracing::warn!(
                        axis = %axis,
                        attempt = attempt + 1,
                        "Scoring failed for {:?}, retrying in {:?}: {e}",
                        source,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One scorer call on the blocking pool, bounded by the policy timeout.
    async fn score_once(
        &self,
        image: Arc<DynamicImage>,
        texts: Arc<Vec<String>>,
        source: &Path,
    ) -> Result<Vec<f32>, PipelineError> {
        let scorer = self.scorer.clone();
        let timeout_duration = Duration::from_millis(self.policy.timeout_ms);

        let result = timeout(
            timeout_duration,
            tokio::task::spawn_blocking(move || scorer.score(&image, &texts)),
        )
        .await;

        match result {
            Ok(Ok(scores)) => scores,
            Ok(Err(e)) => Err(PipelineError::Scoring {
                message: format!("Task join error: {e}"),
            }),
            Err(_) => Err(PipelineError::Timeout {
                path: source.to_path_buf(),
                stage: "score".to_string(),
                timeout_ms: self.policy.timeout_ms,
            }),
        }
    }
}
