//! Score aggregation: raw prompt scores → one axis verdict.
//!
//! Steps:
//! 1. group raw scores by the label their prompt came from (n groups of m)
//! 2. average each group (prompt ensembling)
//! 3. softmax the averaged scores into a distribution over labels
//! 4. pick the arg-max label if its probability clears the threshold
//!
//! Everything here is a pure function of its inputs.

use crate::error::{ConfigError, PipelineError};
use crate::math;
use crate::types::{Axis, AxisReport, LabelProbability, Verdict};

use super::prompts::PromptPair;

/// Mean raw score per label, in vocabulary order.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScores(pub Vec<f64>);

/// Probability per label, in vocabulary order. Sums to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDistribution(pub Vec<f64>);

impl LabelDistribution {
    /// Index and probability of the most likely label.
    ///
    /// Ties go to the earliest label in vocabulary order.
    pub fn arg_max(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &p) in self.0.iter().enumerate() {
            match best {
                Some((_, best_p)) if p <= best_p => {}
                _ => best = Some((i, p)),
            }
        }
        best
    }
}

/// Reject thresholds outside [0, 1] (NaN included).
pub fn validate_threshold(threshold: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "threshold must be between 0.0 and 1.0 (got {threshold})"
        )))
    }
}

/// Group raw scores by label.
///
/// `scores[i]` must belong to `pairs[i]`. Every label must end up with exactly
/// `template_count` scores, and every score must be finite.
pub fn group_by_label(
    axis: Axis,
    pairs: &[PromptPair],
    scores: &[f32],
    label_count: usize,
    template_count: usize,
) -> Result<Vec<Vec<f64>>, PipelineError> {
    if scores.len() != pairs.len() {
        return Err(aggregation(
            axis,
            format!(
                "scorer returned {} scores for {} prompts",
                scores.len(),
                pairs.len()
            ),
        ));
    }

    let mut groups: Vec<Vec<f64>> = vec![Vec::with_capacity(template_count); label_count];
    for (pair, &score) in pairs.iter().zip(scores) {
        if !score.is_finite() {
            return Err(aggregation(
                axis,
                format!("non-finite score {score} for prompt {:?}", pair.text),
            ));
        }
        let group = groups.get_mut(pair.label_index).ok_or_else(|| {
            aggregation(
                axis,
                format!(
                    "prompt {:?} refers to label #{} outside a vocabulary of {}",
                    pair.text, pair.label_index, label_count
                ),
            )
        })?;
        group.push(f64::from(score));
    }

    if let Some((index, group)) = groups
        .iter()
        .enumerate()
        .find(|(_, g)| g.len() != template_count)
    {
        return Err(aggregation(
            axis,
            format!(
                "label #{index} has {} scores, expected {template_count}",
                group.len()
            ),
        ));
    }

    Ok(groups)
}

/// Average each label's scores.
pub fn average(axis: Axis, groups: &[Vec<f64>]) -> Result<LabelScores, PipelineError> {
    groups
        .iter()
        .enumerate()
        .map(|(i, g)| {
            math::mean(g).ok_or_else(|| aggregation(axis, format!("label #{i} has no scores")))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LabelScores)
}

/// Softmax the per-label means into a distribution.
pub fn normalize(scores: &LabelScores) -> LabelDistribution {
    LabelDistribution(math::softmax(&scores.0))
}

/// Threshold the distribution: the arg-max label, or `Uncertain`.
///
/// Returns the verdict together with the arg-max probability.
pub fn decide(
    labels: &[String],
    distribution: &LabelDistribution,
    threshold: f32,
) -> Result<(Verdict, f64), ConfigError> {
    validate_threshold(threshold)?;
    let (index, confidence) = distribution.arg_max().ok_or_else(|| {
        ConfigError::ValidationError("cannot decide over an empty vocabulary".into())
    })?;
    let label = labels.get(index).ok_or_else(|| {
        ConfigError::ValidationError(format!(
            "distribution has {} entries for {} labels",
            distribution.0.len(),
            labels.len()
        ))
    })?;
    let verdict = if confidence >= f64::from(threshold) {
        Verdict::Label(label.clone())
    } else {
        Verdict::Uncertain
    };
    Ok((verdict, confidence))
}

/// Run all four aggregation steps for one axis.
pub fn aggregate(
    axis: Axis,
    labels: &[String],
    template_count: usize,
    pairs: &[PromptPair],
    scores: &[f32],
    threshold: f32,
) -> crate::error::Result<AxisReport> {
    validate_threshold(threshold)?;
    let groups = group_by_label(axis, pairs, scores, labels.len(), template_count)?;
    let means = average(axis, &groups)?;
    let distribution = normalize(&means);
    let (verdict, confidence) = decide(labels, &distribution, threshold)?;

    tracing::debug!(
        axis = %axis,
        verdict = %verdict,
        confidence,
        threshold,
        "Aggregated {} prompt scores over {} labels",
        scores.len(),
        labels.len()
    );

    Ok(AxisReport {
        axis,
        verdict,
        confidence,
        threshold,
        distribution: labels
            .iter()
            .zip(distribution.0)
            .map(|(label, probability)| LabelProbability {
                label: label.clone(),
                probability,
            })
            .collect(),
    })
}

fn aggregation(axis: Axis, message: String) -> PipelineError {
    PipelineError::Aggregation { axis, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::prompts::expand;
    use crate::error::AttireError;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn red_blue() -> (Vec<String>, Vec<PromptPair>) {
        let labels = strings(&["red", "blue"]);
        let pairs = expand(&labels, &strings(&["a {} shirt"])).unwrap();
        (labels, pairs)
    }

    #[test]
    fn test_confident_red() {
        let (labels, pairs) = red_blue();
        let report = aggregate(Axis::Color, &labels, 1, &pairs, &[2.0, 1.0], 0.5).unwrap();
        assert_eq!(report.verdict, Verdict::Label("red".to_string()));
        assert!((report.confidence - 0.731).abs() < 1e-3);
        assert!((report.distribution[1].probability - 0.269).abs() < 1e-3);
        assert_eq!(report.distribution[0].label, "red");
    }

    #[test]
    fn test_near_equal_scores_are_uncertain() {
        let (labels, pairs) = red_blue();
        let report = aggregate(Axis::Color, &labels, 1, &pairs, &[0.1, 0.0], 0.6).unwrap();
        assert_eq!(report.verdict, Verdict::Uncertain);
        assert!((report.confidence - 0.525).abs() < 1e-3);
    }

    #[test]
    fn test_averaging_across_templates() {
        let labels = strings(&["striped", "plain"]);
        let pairs = expand(&labels, &strings(&["a {} shirt", "{} clothing"])).unwrap();
        let groups = group_by_label(Axis::Pattern, &pairs, &[3.0, 1.0, 2.5, 2.5], 2, 2).unwrap();
        let means = average(Axis::Pattern, &groups).unwrap();
        assert_eq!(means, LabelScores(vec![2.0, 2.5]));
    }

    #[test]
    fn test_grouping_is_order_independent() {
        let labels: Vec<String> = (0..6).map(|i| format!("label{i}")).collect();
        let templates = strings(&["a {}", "the {}", "some {}"]);
        let pairs = expand(&labels, &templates).unwrap();
        let scores: Vec<f32> = (0..pairs.len()).map(|i| (i as f32 * 0.37).sin() * 30.0).collect();
        let baseline = average(
            Axis::Type,
            &group_by_label(Axis::Type, &pairs, &scores, 6, 3).unwrap(),
        )
        .unwrap();

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut zipped: Vec<(PromptPair, f32)> =
                pairs.iter().cloned().zip(scores.iter().copied()).collect();
            zipped.shuffle(&mut rng);
            let (shuffled_pairs, shuffled_scores): (Vec<_>, Vec<_>) = zipped.into_iter().unzip();
            let shuffled = average(
                Axis::Type,
                &group_by_label(Axis::Type, &shuffled_pairs, &shuffled_scores, 6, 3).unwrap(),
            )
            .unwrap();
            for (a, b) in baseline.0.iter().zip(&shuffled.0) {
                assert!((a - b).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_distribution_sums_to_one() {
        let labels: Vec<String> = (0..16).map(|i| format!("label{i}")).collect();
        let pairs = expand(&labels, &strings(&["{}"])).unwrap();
        let scores: Vec<f32> = (0..16).map(|i| 18.0 + i as f32 * 0.9).collect();
        let report = aggregate(Axis::Type, &labels, 1, &pairs, &scores, 0.0).unwrap();
        let sum: f64 = report.distribution.iter().map(|p| p.probability).sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(report
            .distribution
            .iter()
            .all(|p| (0.0..=1.0).contains(&p.probability)));
        // Highest mean wins
        assert_eq!(report.verdict, Verdict::Label("label15".to_string()));
    }

    #[test]
    fn test_raising_threshold_only_adds_uncertainty() {
        let (labels, pairs) = red_blue();
        let scores = [1.2, 0.4];
        let mut was_uncertain = false;
        for step in 0..=20 {
            let threshold = step as f32 / 20.0;
            let report = aggregate(Axis::Color, &labels, 1, &pairs, &scores, threshold).unwrap();
            if was_uncertain {
                assert!(report.verdict.is_uncertain(), "flipped back at {threshold}");
            }
            was_uncertain = report.verdict.is_uncertain();
        }
        assert!(was_uncertain);
    }

    #[test]
    fn test_tie_goes_to_first_label() {
        let labels = strings(&["navy", "black", "white"]);
        let pairs = expand(&labels, &strings(&["{}"])).unwrap();
        for _ in 0..5 {
            let report = aggregate(Axis::Color, &labels, 1, &pairs, &[5.0, 5.0, 1.0], 0.0).unwrap();
            assert_eq!(report.verdict, Verdict::Label("navy".to_string()));
        }
    }

    #[test]
    fn test_arg_max_tie_break() {
        let dist = LabelDistribution(vec![0.2, 0.4, 0.4]);
        assert_eq!(dist.arg_max(), Some((1, 0.4)));
        assert_eq!(LabelDistribution(vec![]).arg_max(), None);
    }

    #[test]
    fn test_nan_score_is_aggregation_error() {
        let (labels, pairs) = red_blue();
        let err = aggregate(Axis::Color, &labels, 1, &pairs, &[f32::NAN, 1.0], 0.5).unwrap_err();
        assert!(matches!(
            err,
            AttireError::Pipeline(PipelineError::Aggregation {
                axis: Axis::Color,
                ..
            })
        ));
    }

    #[test]
    fn test_infinite_score_is_aggregation_error() {
        let (labels, pairs) = red_blue();
        let err = group_by_label(Axis::Color, &pairs, &[1.0, f32::INFINITY], 2, 1).unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn test_score_count_mismatch() {
        let (_, pairs) = red_blue();
        let err = group_by_label(Axis::Color, &pairs, &[1.0], 2, 1).unwrap_err();
        assert!(err.to_string().contains("1 scores for 2 prompts"));
    }

    #[test]
    fn test_group_size_mismatch() {
        let labels = strings(&["red", "blue"]);
        let pairs = vec![
            PromptPair {
                label_index: 0,
                text: "a red shirt".into(),
            },
            PromptPair {
                label_index: 0,
                text: "a red top".into(),
            },
        ];
        let err = group_by_label(Axis::Color, &pairs, &[1.0, 2.0], labels.len(), 1).unwrap_err();
        assert!(matches!(err, PipelineError::Aggregation { .. }));
    }

    #[test]
    fn test_label_index_out_of_range() {
        let pairs = vec![PromptPair {
            label_index: 3,
            text: "a teal shirt".into(),
        }];
        let err = group_by_label(Axis::Color, &pairs, &[1.0], 1, 1).unwrap_err();
        assert!(err.to_string().contains("outside a vocabulary"));
    }

    #[test]
    fn test_threshold_out_of_range_is_config_error() {
        let (labels, pairs) = red_blue();
        let err = aggregate(Axis::Color, &labels, 1, &pairs, &[2.0, 1.0], 1.5).unwrap_err();
        assert!(matches!(err, AttireError::Config(_)));
        assert!(validate_threshold(f32::NAN).is_err());
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
    }
}
