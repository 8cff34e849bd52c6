//! Per-file processing pipeline.
//!
//! - **validate**: size and format checks before decoding
//! - **decode**: load and decode images with a timeout
//! - **normalize**: crop, resize, pad and flatten (the default [`Preprocessor`])
//! - **discovery**: find image files in directories
//! - **processor**: preprocess then classify one file

pub mod decode;
pub mod discovery;
pub mod normalize;
pub mod processor;
pub mod validate;

pub use decode::ImageDecoder;
pub use discovery::FileDiscovery;
pub use normalize::{normalize_image, ImageNormalizer, Preprocessor};
pub use processor::{GarmentProcessor, ProcessOptions};
pub use validate::Validator;
