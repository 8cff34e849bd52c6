//! Configuration management for Attire.
//!
//! Configuration is loaded from the platform config directory with defaults
//! for every section. The per-axis vocabularies, templates and thresholds live
//! under `[axes.color]`, `[axes.pattern]` and `[axes.type]` and are immutable
//! once loaded.

mod types;
mod validate;

pub use types::*;
pub(crate) use validate::validate_axis;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Attire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Input discovery settings
    pub processing: ProcessingConfig,

    /// Image normalization settings
    pub preprocess: PreprocessConfig,

    /// Scorer retry policy
    pub pipeline: PipelineConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// CLIP model settings
    pub model: ModelConfig,

    /// Per-axis vocabularies, templates and thresholds
    pub axes: AxesConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.attire.attire/config.toml
    /// - Linux: ~/.config/attire/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\attire\config\config.toml
    ///
    /// Falls back to ~/.attire/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "attire", "attire")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".attire").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        let path_str = self.general.model_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Directory holding the configured CLIP model's files.
    pub fn model_path(&self) -> PathBuf {
        self.model_dir().join(&self.model.name)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.preprocess.output_size, 512);
        assert_eq!(config.pipeline.retry_attempts, 1);
        assert_eq!(config.model.name, "clip-vit-base-patch32");
        assert_eq!(config.axes.color.labels.len(), 12);
        assert_eq!(config.axes.pattern.labels.len(), 10);
        assert_eq!(config.axes.garment_type.labels.len(), 16);
    }

    #[test]
    fn test_default_thresholds_match_call_sites() {
        let config = Config::default();
        assert_eq!(config.axes.color.threshold, 0.5);
        assert_eq!(config.axes.pattern.threshold, 0.5);
        assert_eq!(config.axes.garment_type.threshold, 0.5);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[axes.color]"));
        assert!(toml.contains("[axes.type]"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let toml = Config::default().to_toml().unwrap();
        let parsed = Config::from_toml(&toml).unwrap();
        assert_eq!(parsed.axes, Config::default().axes);
    }

    #[test]
    fn test_partial_axis_override() {
        let config = Config::from_toml(
            r#"
            [axes.color]
            labels = ["red", "blue"]
            templates = ["a {} shirt"]
            threshold = 0.6
            "#,
        )
        .unwrap();
        assert_eq!(config.axes.color.labels, vec!["red", "blue"]);
        assert_eq!(config.axes.color.threshold, 0.6);
        // Untouched axes keep their defaults
        assert_eq!(config.axes.pattern, AxesConfig::default().pattern);
    }

    #[test]
    fn test_threshold_only_axis_keeps_default_vocabulary() {
        let config = Config::from_toml("[axes.color]\nthreshold = 0.6\n").unwrap();
        let defaults = AxesConfig::default();
        assert_eq!(config.axes.color.threshold, 0.6);
        assert_eq!(config.axes.color.labels, defaults.color.labels);
        assert_eq!(config.axes.color.templates, defaults.color.templates);
    }

    #[test]
    fn test_axis_labels_only_keeps_default_templates() {
        let config = Config::from_toml(
            r#"
            [axes.type]
            labels = ["dress", "coat"]
            "#,
        )
        .unwrap();
        assert_eq!(config.axes.garment_type.labels, vec!["dress", "coat"]);
        assert_eq!(
            config.axes.garment_type.templates,
            AxesConfig::default().garment_type.templates
        );
        assert_eq!(config.axes.garment_type.threshold, 0.5);
    }

    #[test]
    fn test_explicit_empty_labels_still_rejected() {
        assert!(Config::from_toml("[axes.pattern]\nlabels = []\n").is_err());
    }

    #[test]
    fn test_axis_threshold_defaults_when_omitted() {
        let config = Config::from_toml(
            r#"
            [axes.pattern]
            labels = ["striped", "plain"]
            templates = ["a {} shirt"]
            "#,
        )
        .unwrap();
        assert_eq!(config.axes.pattern.threshold, 0.5);
    }

    #[test]
    fn test_load_from_rejects_bad_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[axes.type]\nlabels = [\"dress\"]\ntemplates = [\"a {}\"]\nthreshold = 1.2\n",
        )
        .unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("axes.type.threshold"));
    }

    #[test]
    fn test_model_path_joins_name() {
        let mut config = Config::default();
        config.general.model_dir = PathBuf::from("/opt/models");
        assert_eq!(
            config.model_path(),
            PathBuf::from("/opt/models/clip-vit-base-patch32")
        );
    }
}
