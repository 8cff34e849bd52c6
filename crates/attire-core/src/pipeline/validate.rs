//! Input validation before decoding.

use std::io::Read;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Bytes read to sniff the image format.
const HEADER_LEN: usize = 16;

/// Validates files before they are decoded.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a validator enforcing `limits`.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Cheap checks before a full decode.
    ///
    /// - File exists
    /// - File size is within limits
    /// - Header bytes belong to a format the `image` crate can decode
    pub fn validate(&self, path: &Path) -> Result<(), PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let metadata = std::fs::metadata(path).map_err(|e| PipelineError::Preprocess {
            path: path.to_path_buf(),
            message: format!("Cannot read metadata: {e}"),
        })?;

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        self.check_header(path)
    }

    fn check_header(&self, path: &Path) -> Result<(), PipelineError> {
        let mut file = std::fs::File::open(path).map_err(|e| PipelineError::Preprocess {
            path: path.to_path_buf(),
            message: format!("Cannot open file: {e}"),
        })?;

        let mut header = Vec::with_capacity(HEADER_LEN);
        file.by_ref()
            .take(HEADER_LEN as u64)
            .read_to_end(&mut header)
            .map_err(|e| PipelineError::Preprocess {
                path: path.to_path_buf(),
                message: format!("Cannot read header: {e}"),
            })?;

        image::guess_format(&header)
            .map(|_| ())
            .map_err(|_| PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            })
    }
}
