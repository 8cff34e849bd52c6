//! Garment image normalization.
//!
//! Product photos arrive with their background already removed (transparent)
//! at arbitrary sizes and offsets. Normalization puts every garment in the
//! same frame before scoring:
//!
//! 1. crop to the bounding box of visible (non-transparent) pixels
//! 2. shrink to fit `output_size` with Lanczos3, keeping aspect ratio
//! 3. center on a transparent `output_size` square
//! 4. flatten onto white, giving an RGB image

use std::path::Path;

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

use crate::config::{Config, PreprocessConfig};
use crate::error::PipelineError;

use super::decode::ImageDecoder;
use super::validate::Validator;

/// Turns a raw image file into one normalized RGB image.
#[async_trait]
pub trait Preprocessor: Send + Sync {
    async fn normalize(&self, path: &Path) -> Result<DynamicImage, PipelineError>;
}

/// Default [`Preprocessor`]: validate, decode, crop, resize, pad, flatten.
pub struct ImageNormalizer {
    validator: Validator,
    decoder: ImageDecoder,
    config: PreprocessConfig,
}

impl ImageNormalizer {
    /// Normalizer using the `[preprocess]` and `[limits]` settings.
    pub fn new(config: &Config) -> Self {
        Self {
            validator: Validator::new(config.limits.clone()),
            decoder: ImageDecoder::new(config.limits.clone()),
            config: config.preprocess.clone(),
        }
    }
}

#[async_trait]
impl Preprocessor for ImageNormalizer {
    async fn normalize(&self, path: &Path) -> Result<DynamicImage, PipelineError> {
        let start = std::time::Instant::now();
        self.validator.validate(path)?;
        let decoded = self.decoder.decode(path).await?;
        tracing::trace!("  Decode: {:?}", start.elapsed());

        let config = self.config.clone();
        let path_owned = path.to_path_buf();
        let normalized =
            tokio::task::spawn_blocking(move || normalize_image(&decoded, &config, &path_owned))
                .await
                .map_err(|e| PipelineError::Preprocess {
                    path: path.to_path_buf(),
                    message: format!("Task join error: {e}"),
                })??;

        tracing::debug!("Normalized {:?} in {:?}", path, start.elapsed());
        Ok(normalized)
    }
}

/// Normalize a decoded image into an `output_size` square RGB image.
pub fn normalize_image(
    image: &DynamicImage,
    config: &PreprocessConfig,
    path: &Path,
) -> Result<DynamicImage, PipelineError> {
    let rgba = image.to_rgba8();
    let (x, y, width, height) =
        visible_bounds(&rgba, config.alpha_threshold).ok_or_else(|| PipelineError::Preprocess {
            path: path.to_path_buf(),
            message: "no visible content to crop".to_string(),
        })?;

    let cropped = imageops::crop_imm(&rgba, x, y, width, height).to_image();

    let size = config.output_size;
    let fitted = if width > size || height > size {
        DynamicImage::ImageRgba8(cropped)
            .resize(size, size, FilterType::Lanczos3)
            .to_rgba8()
    } else {
        cropped
    };

    let mut canvas = RgbaImage::from_pixel(size, size, Rgba([255, 255, 255, 0]));
    let offset_x = (size - fitted.width()) / 2;
    let offset_y = (size - fitted.height()) / 2;
    imageops::overlay(&mut canvas, &fitted, offset_x.into(), offset_y.into());

    Ok(DynamicImage::ImageRgb8(flatten_on_white(&canvas)))
}

/// Bounding box `(x, y, width, height)` of pixels with alpha above `threshold`.
///
/// `None` when every pixel is at or below the threshold.
pub fn visible_bounds(image: &RgbaImage, threshold: u8) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] <= threshold {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| (x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}

/// Composite an RGBA image over an opaque white background.
fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        let alpha = f32::from(a) / 255.0;
        let blend = |c: u8| (f32::from(c) * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
