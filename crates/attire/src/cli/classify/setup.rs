//! Classifier setup: config overrides and model loading.

use std::sync::Arc;

use anyhow::Context;
use attire_core::{
    AttributeClassifier, ClipScorer, Config, GarmentProcessor, OutputFormat as CoreOutputFormat,
    ProcessOptions,
};

use super::{ClassifyArgs, ClassifyContext};

/// Validate input, load config and model, and assemble the processor.
pub fn setup_processor(args: &ClassifyArgs) -> anyhow::Result<ClassifyContext> {
    if !args.input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.input
        );
    }

    let mut config = Config::load().context("Failed to load configuration")?;
    apply_overrides(&mut config, args);

    let output_format = resolve_format(args, &config)?;

    let model_path = config.model_path();
    if !ClipScorer::model_exists(&model_path) {
        anyhow::bail!(
            "CLIP model not found at {:?}\n\n  Hint: Run `attire models download` first.",
            model_path
        );
    }
    let scorer = ClipScorer::load(&config.model, &model_path)?;

    // Axis validation (including threshold overrides) happens here.
    let classifier = AttributeClassifier::from_config(Arc::new(scorer), &config)?;
    let processor = GarmentProcessor::new(&config, classifier);

    let options = ProcessOptions {
        explain: args.explain,
        include_image: args.include_image || config.output.include_image,
        save_normalized: args.save_normalized.clone(),
    };

    Ok(ClassifyContext {
        processor,
        options,
        output_format,
        pretty: config.output.pretty,
    })
}

/// Apply per-axis threshold flags on top of the loaded config.
fn apply_overrides(config: &mut Config, args: &ClassifyArgs) {
    if let Some(threshold) = args.color_threshold {
        config.axes.color.threshold = threshold;
    }
    if let Some(threshold) = args.pattern_threshold {
        config.axes.pattern.threshold = threshold;
    }
    if let Some(threshold) = args.type_threshold {
        config.axes.garment_type.threshold = threshold;
    }
}

/// `--format` wins over `output.format`.
fn resolve_format(args: &ClassifyArgs, config: &Config) -> anyhow::Result<CoreOutputFormat> {
    match args.format {
        Some(format) => Ok(format.into()),
        None => config
            .output
            .format
            .parse()
            .context("Invalid output.format in configuration"),
    }
}

#[cfg(test)]
mod tests {
    use super::super::OutputFormat;
    use super::*;

    #[test]
    fn test_threshold_overrides() {
        let mut config = Config::default();
        let args = ClassifyArgs {
            pattern_threshold: Some(0.8),
            type_threshold: Some(0.25),
            ..ClassifyArgs::default()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.axes.color.threshold, 0.5);
        assert_eq!(config.axes.pattern.threshold, 0.8);
        assert_eq!(config.axes.garment_type.threshold, 0.25);
    }

    #[test]
    fn test_format_flag_wins_over_config() {
        let mut config = Config::default();
        config.output.format = "json".to_string();
        let args = ClassifyArgs {
            format: Some(OutputFormat::Jsonl),
            ..ClassifyArgs::default()
        };
        assert_eq!(
            resolve_format(&args, &config).unwrap(),
            CoreOutputFormat::JsonLines
        );
    }

    #[test]
    fn test_format_from_config() {
        let mut config = Config::default();
        config.output.format = "jsonl".to_string();
        assert_eq!(
            resolve_format(&ClassifyArgs::default(), &config).unwrap(),
            CoreOutputFormat::JsonLines
        );

        config.output.format = "yaml".to_string();
        assert!(resolve_format(&ClassifyArgs::default(), &config).is_err());
    }

    #[test]
    fn test_missing_input_fails() {
        let args = ClassifyArgs {
            input: "/nonexistent/closet".into(),
            ..ClassifyArgs::default()
        };
        let err = setup_processor(&args).err().unwrap();
        assert!(err.to_string().contains("does not exist"));
    }
}
