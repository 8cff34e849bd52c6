//! Configuration validation with range checks.

use crate::classify::prompts;
use crate::error::ConfigError;
use crate::types::{Axis, UNCERTAIN};

use super::{AxisConfig, Config};

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.preprocess.output_size == 0 {
            return Err(ConfigError::ValidationError(
                "preprocess.output_size must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.score_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.score_timeout_ms must be > 0".into(),
            ));
        }
        if self.model.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "model.image_size must be > 0".into(),
            ));
        }
        if !self.model.logit_scale.is_finite() || self.model.logit_scale <= 0.0 {
            return Err(ConfigError::ValidationError(
                "model.logit_scale must be a positive number".into(),
            ));
        }
        for axis in Axis::ALL {
            validate_axis(axis, self.axes.get(axis))?;
        }
        Ok(())
    }
}

/// Validate one axis: vocabulary, templates and threshold.
pub(crate) fn validate_axis(axis: Axis, config: &AxisConfig) -> Result<(), ConfigError> {
    prompts::validate_vocabulary(&config.labels).map_err(|e| scoped(axis, e))?;
    for template in &config.templates {
        prompts::validate_template(template).map_err(|e| scoped(axis, e))?;
    }
    if config.templates.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "axes.{axis}.templates must not be empty"
        )));
    }
    if let Some(label) = config.labels.iter().find(|l| l.as_str() == UNCERTAIN) {
        return Err(ConfigError::ValidationError(format!(
            "axes.{axis}.labels must not contain the reserved verdict \"{label}\""
        )));
    }
    crate::classify::aggregate::validate_threshold(config.threshold).map_err(|_| {
        ConfigError::ValidationError(format!(
            "axes.{axis}.threshold must be between 0.0 and 1.0 (got {})",
            config.threshold
        ))
    })
}

fn scoped(axis: Axis, err: ConfigError) -> ConfigError {
    match err {
        ConfigError::ValidationError(msg) => {
            ConfigError::ValidationError(format!("axes.{axis}: {msg}"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_output_size() {
        let mut config = Config::default();
        config.preprocess.output_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output_size"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.score_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("score_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_invalid_threshold() {
        let mut config = Config::default();
        config.axes.pattern.threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("axes.pattern.threshold"));

        config.axes.pattern.threshold = -0.1;
        assert!(config.validate().is_err());

        config.axes.pattern.threshold = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_threshold_bounds() {
        let mut config = Config::default();
        config.axes.color.threshold = 0.0;
        config.axes.garment_type.threshold = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_vocabulary() {
        let mut config = Config::default();
        config.axes.color.labels.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("axes.color"));
    }

    #[test]
    fn test_validate_rejects_template_without_slot() {
        let mut config = Config::default();
        config.axes.garment_type.templates.push("a photo of clothing".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("axes.type"));
    }

    #[test]
    fn test_validate_rejects_empty_templates() {
        let mut config = Config::default();
        config.axes.pattern.templates.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("axes.pattern.templates"));
    }

    #[test]
    fn test_validate_rejects_duplicate_label() {
        let mut config = Config::default();
        config.axes.color.labels = vec!["red".into(), "red".into(), "blue".into()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("axes.color"));
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_validate_rejects_reserved_label() {
        let mut config = Config::default();
        config.axes.color.labels.push("uncertain".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_validate_rejects_non_positive_logit_scale() {
        let mut config = Config::default();
        config.model.logit_scale = 0.0;
        assert!(config.validate().is_err());
    }
}
