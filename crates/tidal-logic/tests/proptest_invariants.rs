//! Property-based tests for grid, scoring and session-state invariants.
//!
//! Whatever sequence of tool actions a player performs:
//! 1. Cell depth never decreases and stays within [0, 1]
//! 2. Completion percentages stay within [0, 100]
//! 3. Discovered artifacts never exceed the site's artifacts and never repeat
//! 4. Documentation tools never change depth

use proptest::prelude::*;

use tidal_logic::config::{Difficulty, GameConfig};
use tidal_logic::grid::{GridCell, GridPosition};
use tidal_logic::scoring::{
    compliance_score, compute_completion, overall_score, CompletionInputs, CompletionWeights,
    PenaltyConfig,
};
use tidal_logic::site::generate_practice_site;
use tidal_logic::state::ExcavationState;
use tidal_logic::tools::Tool;

// =============================================================================
// Strategy helpers
// =============================================================================

fn tool_strategy() -> impl Strategy<Value = Tool> {
    prop::sample::select(Tool::ALL.to_vec())
}

fn difficulty_strategy() -> impl Strategy<Value = Difficulty> {
    prop::sample::select(Difficulty::ALL.to_vec())
}

/// A list of (x, y, tool) actions on a grid no larger than 10x10.
fn actions_strategy() -> impl Strategy<Value = Vec<(u32, u32, Tool)>> {
    prop::collection::vec((0u32..10, 0u32..10, tool_strategy()), 0..80)
}

fn inputs_strategy() -> impl Strategy<Value = CompletionInputs> {
    (0usize..200, 0usize..20, 0usize..20).prop_flat_map(|(cells, artifacts, docs)| {
        (0..=cells, 0..=artifacts, 0..=docs).prop_map(move |(ex, found, done)| CompletionInputs {
            total_cells: cells,
            excavated_cells: ex,
            total_artifacts: artifacts,
            discovered_artifacts: found,
            total_required_docs: docs,
            completed_required_docs: done,
        })
    })
}

// =============================================================================
// Grid
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_deepen_monotonic_and_clamped(
        increments in prop::collection::vec(prop::num::f32::ANY, 0..30)
    ) {
        let mut cell = GridCell::new(GridPosition::new(0, 0));
        let mut last = cell.excavation_depth;
        for inc in increments {
            let depth = cell.deepen(inc);
            prop_assert!(depth >= last);
            prop_assert!((0.0..=1.0).contains(&depth));
            prop_assert_eq!(cell.excavated, depth > 0.0);
            last = depth;
        }
    }
}

// =============================================================================
// Scoring
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_completion_within_bounds(
        inputs in inputs_strategy(),
        ex in 0.0f32..5.0,
        art in 0.0f32..5.0,
        doc in 0.0f32..5.0,
    ) {
        let weights = CompletionWeights { excavation: ex, artifacts: art, documentation: doc };
        let c = compute_completion(&inputs, &weights);
        for v in [c.excavation, c.artifacts, c.documentation, c.overall] {
            prop_assert!((0.0..=100.0).contains(&v), "out of range: {}", v);
        }
    }

    #[test]
    fn prop_overall_score_bounded(
        violations in 0usize..50,
        severe in 0usize..50,
        completion in -10.0f32..150.0,
    ) {
        let compliance = compliance_score(violations, severe.min(violations), &PenaltyConfig::default());
        prop_assert!((0.0..=100.0).contains(&compliance));
        prop_assert!(overall_score(completion, compliance) <= 100);
    }
}

// =============================================================================
// Session state
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_actions_preserve_state_invariants(
        seed in any::<u64>(),
        difficulty in difficulty_strategy(),
        actions in actions_strategy(),
    ) {
        let site = generate_practice_site(1, seed, difficulty);
        let config = GameConfig::default();
        let mut state = ExcavationState::new(&site);

        for (x, y, tool) in actions {
            let pos = GridPosition::new(x, y);
            let before = state.grid.cell(pos).cloned();
            let result = state.excavate(pos, tool, &config);

            let Some(before) = before else {
                prop_assert!(result.is_err());
                continue;
            };
            let feedback = result.unwrap();
            prop_assert!(feedback.cell.excavation_depth >= before.excavation_depth);
            prop_assert!(feedback.cell.excavation_depth <= 1.0);
            if matches!(tool, Tool::Camera | Tool::MeasuringTape | Tool::Sieve) {
                prop_assert_eq!(feedback.cell.excavation_depth, before.excavation_depth);
            }
        }

        prop_assert!(state.discovered_artifacts.len() <= site.artifacts.len());
        let mut ids = state.discovered_artifacts.clone();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), state.discovered_artifacts.len());
        prop_assert!(state.check_consistency(&site).is_ok());
    }
}
