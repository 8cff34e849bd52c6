//! Image preprocessing for the CLIP vision encoder.
//!
//! CLIP ViT-B/32 expects:
//! - Input size: 224×224 pixels, shortest side resized then center-cropped
//! - Resampling: bicubic
//! - Normalization: (pixel/255 - mean) / std with CLIP's per-channel statistics
//! - Channel order: RGB
//! - Tensor layout: NCHW [batch, channels, height, width]

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// CLIP normalization mean (per-channel).
const NORM_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std (per-channel).
const NORM_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Preprocess an image for CLIP inference.
///
/// Resizes so the shorter side equals `image_size`, center-crops to a square,
/// normalizes each channel and returns an NCHW tensor for ONNX Runtime.
pub fn preprocess(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let cropped = image.resize_to_fill(image_size, image_size, FilterType::CatmullRom);
    let rgb = cropped.to_rgb8();

    let size = image_size as usize;
    let plane = size * size;
    let mut data = vec![0.0f32; CHANNELS * plane];

    for (i, pixel) in rgb.as_raw().chunks_exact(CHANNELS).enumerate() {
        for (c, &val) in pixel.iter().enumerate() {
            data[c * plane + i] = (val as f32 / 255.0 - NORM_MEAN[c]) / NORM_STD[c];
        }
    }

    // Shape and buffer length agree by construction.
    Array4::from_shape_vec((1, CHANNELS, size, size), data)
        .unwrap_or_else(|_| Array4::zeros((1, CHANNELS, size, size)))
}
