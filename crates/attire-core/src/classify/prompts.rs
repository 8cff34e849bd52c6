//! Prompt expansion: label vocabulary × phrasing templates.
//!
//! Produces every (label, template) combination exactly once, label-major and
//! template-minor, so the same configuration always yields the same prompt list.

use std::collections::HashSet;

use crate::error::ConfigError;

/// The substitution slot a template must contain exactly once.
pub const LABEL_SLOT: &str = "{}";

/// A generated prompt and the vocabulary index of the label it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub label_index: usize,
    pub text: String,
}

/// Check that a vocabulary can be expanded.
pub fn validate_vocabulary(labels: &[String]) -> Result<(), ConfigError> {
    if labels.is_empty() {
        return Err(ConfigError::ValidationError(
            "label vocabulary must not be empty".into(),
        ));
    }
    let mut seen = HashSet::with_capacity(labels.len());
    if let Some(duplicate) = labels.iter().find(|label| !seen.insert(label.as_str())) {
        return Err(ConfigError::ValidationError(format!(
            "label {duplicate:?} appears more than once in the vocabulary"
        )));
    }
    Ok(())
}

/// Check that a template carries exactly one label slot.
pub fn validate_template(template: &str) -> Result<(), ConfigError> {
    match template.matches(LABEL_SLOT).count() {
        1 => Ok(()),
        0 => Err(ConfigError::ValidationError(format!(
            "template {template:?} has no {LABEL_SLOT} slot for the label"
        ))),
        n => Err(ConfigError::ValidationError(format!(
            "template {template:?} has {n} {LABEL_SLOT} slots, expected exactly one"
        ))),
    }
}

/// Substitute a label into a validated template.
pub fn fill(template: &str, label: &str) -> String {
    template.replacen(LABEL_SLOT, label, 1)
}

/// Expand a vocabulary and template set into `labels.len() * templates.len()` prompts.
pub fn expand(labels: &[String], templates: &[String]) -> Result<Vec<PromptPair>, ConfigError> {
    validate_vocabulary(labels)?;
    if templates.is_empty() {
        return Err(ConfigError::ValidationError(
            "template set must not be empty".into(),
        ));
    }
    for template in templates {
        validate_template(template)?;
    }

    let mut pairs = Vec::with_capacity(labels.len() * templates.len());
    for (label_index, label) in labels.iter().enumerate() {
        for template in templates {
            pairs.push(PromptPair {
                label_index,
                text: fill(template, label),
            });
        }
    }
    Ok(pairs)
}
