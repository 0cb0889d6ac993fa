//! Completion and compliance scoring.
//!
//! Three sub-scores (excavation, artifacts, documentation) are blended into
//! an overall completion percentage. Protocol violations feed a separate
//! compliance score. Every value is clamped to [0, 100] and a zero
//! denominator yields 0, never NaN.

use serde::{Deserialize, Serialize};

/// Relative weight of each sub-score in the overall completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionWeights {
    pub excavation: f32,
    pub artifacts: f32,
    pub documentation: f32,
}

impl CompletionWeights {
    /// 0.3 excavation, 0.3 artifacts, 0.4 documentation. Favours the field
    /// notebook; select it by storing these weights with `update_game_config`.
    pub fn documentation_weighted() -> Self {
        Self {
            excavation: 0.3,
            artifacts: 0.3,
            documentation: 0.4,
        }
    }
}

impl Default for CompletionWeights {
    /// Unweighted mean of the three sub-scores. Both session types score
    /// with the configured weights; the 0.3/0.3/0.4 blend is available as
    /// [`CompletionWeights::documentation_weighted`].
    fn default() -> Self {
        Self {
            excavation: 1.0,
            artifacts: 1.0,
            documentation: 1.0,
        }
    }
}

/// Points deducted from the 100-point compliance score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// Deducted for every violation, severe ones included.
    pub per_violation: f32,
    /// Deducted again for each severe violation.
    pub per_severe: f32,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            per_violation: 5.0,
            per_severe: 15.0,
        }
    }
}

/// Raw counts the completion percentage is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionInputs {
    pub total_cells: usize,
    pub excavated_cells: usize,
    pub total_artifacts: usize,
    pub discovered_artifacts: usize,
    pub total_required_docs: usize,
    pub completed_required_docs: usize,
}

/// Sub-scores and the blended overall, each in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionBreakdown {
    pub excavation: f32,
    pub artifacts: f32,
    pub documentation: f32,
    pub overall: f32,
}

/// `part / total` as a percentage. Zero total gives 0.
pub fn percentage(part: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (part as f32 / total as f32 * 100.0).clamp(0.0, 100.0)
}

pub fn compute_completion(
    inputs: &CompletionInputs,
    weights: &CompletionWeights,
) -> CompletionBreakdown {
    let excavation = percentage(inputs.excavated_cells, inputs.total_cells);
    let artifacts = percentage(inputs.discovered_artifacts, inputs.total_artifacts);
    let documentation = percentage(inputs.completed_required_docs, inputs.total_required_docs);

    let total_weight = weights.excavation + weights.artifacts + weights.documentation;
    let overall = if total_weight.is_finite() && total_weight > 0.0 {
        (excavation * weights.excavation
            + artifacts * weights.artifacts
            + documentation * weights.documentation)
            / total_weight
    } else {
        (excavation + artifacts + documentation) / 3.0
    };

    CompletionBreakdown {
        excavation,
        artifacts,
        documentation,
        overall: clamp_percent(overall),
    }
}

/// `max(0, 100 - per_violation * violations - per_severe * severe)`.
pub fn compliance_score(violations: usize, severe: usize, penalties: &PenaltyConfig) -> f32 {
    let deduction =
        penalties.per_violation * violations as f32 + penalties.per_severe * severe as f32;
    clamp_percent(100.0 - deduction)
}

/// Final session score: completion scaled by compliance, rounded.
pub fn overall_score(completion: f32, compliance: f32) -> u32 {
    let score = clamp_percent(completion) * clamp_percent(compliance) / 100.0;
    score.round() as u32
}

fn clamp_percent(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_zero_total() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 0), 0.0);
    }

    #[test]
    fn test_percentage_clamps_overflow() {
        assert_eq!(percentage(12, 10), 100.0);
        assert!((percentage(1, 4) - 25.0).abs() < 1e-4);
    }

    #[test]
    fn test_full_completion() {
        let inputs = CompletionInputs {
            total_cells: 10,
            excavated_cells: 10,
            total_artifacts: 3,
            discovered_artifacts: 3,
            total_required_docs: 4,
            completed_required_docs: 4,
        };
        let b = compute_completion(&inputs, &CompletionWeights::default());
        assert!((b.overall - 100.0).abs() < 1e-3);
        assert_eq!(compliance_score(0, 0, &PenaltyConfig::default()), 100.0);
    }

    #[test]
    fn test_unweighted_mean() {
        let inputs = CompletionInputs {
            total_cells: 10,
            excavated_cells: 5,
            total_artifacts: 2,
            discovered_artifacts: 2,
            total_required_docs: 4,
            completed_required_docs: 0,
        };
        let b = compute_completion(&inputs, &CompletionWeights::default());
        assert!((b.excavation - 50.0).abs() < 1e-3);
        assert!((b.artifacts - 100.0).abs() < 1e-3);
        assert_eq!(b.documentation, 0.0);
        assert!((b.overall - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_custom_weights() {
        let inputs = CompletionInputs {
            total_cells: 10,
            excavated_cells: 10,
            total_artifacts: 1,
            discovered_artifacts: 0,
            total_required_docs: 1,
            completed_required_docs: 1,
        };
        let b = compute_completion(&inputs, &CompletionWeights::documentation_weighted());
        assert!((b.overall - 70.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_site_scores_zero() {
        let b = compute_completion(&CompletionInputs::default(), &CompletionWeights::default());
        assert_eq!(b.overall, 0.0);
        assert!(!b.overall.is_nan());
    }

    #[test]
    fn test_degenerate_weights_fall_back_to_mean() {
        let inputs = CompletionInputs {
            total_cells: 4,
            excavated_cells: 4,
            ..CompletionInputs::default()
        };
        let weights = CompletionWeights {
            excavation: 0.0,
            artifacts: 0.0,
            documentation: 0.0,
        };
        let b = compute_completion(&inputs, &weights);
        assert!((b.overall - 100.0 / 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_compliance_penalties() {
        let p = PenaltyConfig::default();
        assert_eq!(compliance_score(2, 0, &p), 90.0);
        // A severe violation costs 5 + 15.
        assert_eq!(compliance_score(1, 1, &p), 80.0);
        assert_eq!(compliance_score(30, 10, &p), 0.0);
    }

    #[test]
    fn test_overall_score() {
        assert_eq!(overall_score(100.0, 100.0), 100);
        assert_eq!(overall_score(80.0, 50.0), 40);
        assert_eq!(overall_score(150.0, -20.0), 0);
        assert_eq!(overall_score(f32::NAN, 100.0), 0);
    }
}
