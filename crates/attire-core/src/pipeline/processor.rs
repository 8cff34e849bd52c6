//! Pipeline orchestration: one garment file in, one classified record out.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, ImageFormat};

use crate::classify::AttributeClassifier;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::types::ClassifiedImage;

use super::discovery::FileDiscovery;
use super::normalize::{ImageNormalizer, Preprocessor};

/// Options for a single classification.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Attach per-axis probability reports
    pub explain: bool,
    /// Embed the normalized image as base64 PNG
    pub include_image: bool,
    /// Also write the normalized image to `<dir>/<stem>_norm.png`
    pub save_normalized: Option<PathBuf>,
}

/// Wires a [`Preprocessor`] and an [`AttributeClassifier`] together.
pub struct GarmentProcessor {
    preprocessor: Arc<dyn Preprocessor>,
    classifier: AttributeClassifier,
    discovery: FileDiscovery,
}

impl GarmentProcessor {
    /// Processor with the default [`ImageNormalizer`].
    pub fn new(config: &Config, classifier: AttributeClassifier) -> Self {
        Self::with_preprocessor(config, Arc::new(ImageNormalizer::new(config)), classifier)
    }

    /// Processor with a custom preprocessing step.
    pub fn with_preprocessor(
        config: &Config,
        preprocessor: Arc<dyn Preprocessor>,
        classifier: AttributeClassifier,
    ) -> Self {
        Self {
            preprocessor,
            classifier,
            discovery: FileDiscovery::new(config.processing.clone()),
        }
    }

    /// Classify a single image file.
    pub async fn process(&self, path: &Path) -> Result<ClassifiedImage> {
        self.process_with_options(path, &ProcessOptions::default())
            .await
    }

    /// Classify a single image file with custom options.
    ///
    /// Preprocessing failures are returned as errors. Axis failures are not:
    /// they are recorded in the returned prediction.
    pub async fn process_with_options(
        &self,
        path: &Path,
        options: &ProcessOptions,
    ) -> Result<ClassifiedImage> {
        let start = std::time::Instant::now();
        tracing::debug!("Processing: {:?}", path);

        let normalized = Arc::new(self.preprocessor.normalize(path).await?);
        let preprocess_time = start.elapsed();
        tracing::trace!("  Preprocess: {:?}", preprocess_time);

        if let Some(dir) = &options.save_normalized {
            let saved = save_normalized(&normalized, path, dir).await?;
            tracing::debug!("Saved normalized image to {:?}", saved);
        }

        let normalized_image = if options.include_image {
            Some(encode_png_base64(&normalized, path)?)
        } else {
            None
        };

        let classify_start = std::time::Instant::now();
        let classification = self
            .classifier
            .classify_detailed(normalized, path)
            .await;
        tracing::trace!("  Classify: {:?}", classify_start.elapsed());

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        tracing::debug!(
            "Classified {:?} in {:?} (color: {}, pattern: {}, type: {})",
            file_name,
            start.elapsed(),
            summary(&classification.result.color),
            summary(&classification.result.pattern),
            summary(&classification.result.garment_type),
        );

        Ok(ClassifiedImage {
            file_path: path.to_path_buf(),
            file_name,
            prediction: classification.result,
            details: options.explain.then_some(classification.reports),
            normalized_image,
        })
    }

    /// Discover all image files at a path.
    pub fn discover(&self, path: &Path) -> Vec<PathBuf> {
        self.discovery.discover(path)
    }
}

fn summary(outcome: &crate::types::AxisOutcome) -> String {
    match outcome.verdict() {
        Some(verdict) => verdict.to_string(),
        None => "failed".to_string(),
    }
}

fn encode_png(image: &DynamicImage, path: &Path) -> std::result::Result<Vec<u8>, PipelineError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| PipelineError::Preprocess {
            path: path.to_path_buf(),
            message: format!("Cannot encode normalized image: {e}"),
        })?;
    Ok(buffer.into_inner())
}

/// Encode the normalized image as a base64 PNG string.
pub fn encode_png_base64(
    image: &DynamicImage,
    path: &Path,
) -> std::result::Result<String, PipelineError> {
    encode_png(image, path).map(|bytes| BASE64.encode(bytes))
}

/// Write the normalized image as `<dir>/<stem>_norm.png`.
async fn save_normalized(image: &DynamicImage, source: &Path, dir: &Path) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let target = dir.join(format!("{stem}_norm.png"));
    let bytes = encode_png(image, source)?;
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(&target, bytes).await?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ScoringPolicy;
    use crate::config::{AxesConfig, AxisConfig};
    use crate::embedding::SimilarityScorer;
    use crate::error::AttireError;
    use crate::types::{AxisOutcome, Verdict};
    use image::{Rgba, RgbaImage};

    /// Prefers prompts mentioning the dominant channel of the image center.
    struct ChannelScorer;

    impl SimilarityScorer for ChannelScorer {
        fn score(
            &self,
            image: &DynamicImage,
            texts: &[String],
        ) -> std::result::Result<Vec<f32>, PipelineError> {
            let rgb = image.to_rgb8();
            let center = rgb.get_pixel(rgb.width() / 2, rgb.height() / 2);
            let dominant = if center[0] > center[2] { "red" } else { "blue" };
            Ok(texts
                .iter()
                .map(|t| if t.contains(dominant) { 30.0 } else { 20.0 })
                .collect())
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.preprocess.output_size = 32;
        config.axes = AxesConfig {
            color: AxisConfig::new(&["red", "blue"], &["a {} shirt"], 0.5),
            pattern: AxisConfig::new(&["plain", "striped"], &["a {} pattern"], 0.9),
            garment_type: AxisConfig::new(&["shirt", "dress"], &["a {}"], 0.5),
        };
        config
    }

    fn processor(config: &Config) -> GarmentProcessor {
        let classifier = AttributeClassifier::new(
            Arc::new(ChannelScorer),
            &config.axes,
            ScoringPolicy::from_config(config),
        )
        .unwrap();
        GarmentProcessor::new(config, classifier)
    }

    fn write_garment(dir: &Path, name: &str, color: Rgba<u8>) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (5..35).contains(&y) {
                color
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
        path
    }

    #[tokio::test]
    async fn test_process_classifies_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_garment(dir.path(), "red_tee.png", Rgba([220, 10, 10, 255]));
        let config = config();

        let record = processor(&config).process(&path).await.unwrap();
        assert_eq!(record.file_name, "red_tee.png");
        assert_eq!(
            record.prediction.color,
            AxisOutcome::Verdict(Verdict::Label("red".to_string()))
        );
        // No pattern prompt mentions a color: flat scores stay under 0.9
        assert_eq!(record.prediction.pattern, AxisOutcome::Verdict(Verdict::Uncertain));
        assert!(record.details.is_none());
        assert!(record.normalized_image.is_none());
    }

    #[tokio::test]
    async fn test_process_with_explain_and_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_garment(dir.path(), "blue.png", Rgba([10, 10, 220, 255]));
        let config = config();
        let options = ProcessOptions {
            explain: true,
            include_image: true,
            save_normalized: Some(dir.path().join("normalized")),
        };

        let record = processor(&config)
            .process_with_options(&path, &options)
            .await
            .unwrap();
        let details = record.details.unwrap();
        assert_eq!(details.len(), 3);
        assert_eq!(details[0].verdict, Verdict::Label("blue".to_string()));

        let png = BASE64.decode(record.normalized_image.unwrap()).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 32);
        assert!(dir.path().join("normalized/blue_norm.png").exists());
    }

    #[tokio::test]
    async fn test_transparent_file_is_preprocessing_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_garment(dir.path(), "ghost.png", Rgba([0, 0, 0, 0]));
        let config = config();

        let err = processor(&config).process(&path).await.unwrap_err();
        match err {
            AttireError::Pipeline(e) => assert!(e.is_preprocessing()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_discover_uses_processing_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("b.heic"), b"x").unwrap();
        let config = config();
        assert_eq!(processor(&config).discover(dir.path()).len(), 1);
    }
}
