//! Whole-layout fitness: the scalar the annealer accepts on, plus the
//! breakdown surfaced to hosts. Spread/positive predicates are cached per
//! mutation id.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::CatalogParser;
use crate::garden::State;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MutationTraits {
    spread: bool,
    positive_only: bool,
}

/// Score components for one layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub placed: usize,
    pub requested: usize,
    pub placement_rate: f64,
    pub total_crops: usize,
    pub shared_crops: usize,
    /// Share of crops serving two or more mutations.
    pub crop_efficiency: f64,
    pub compactness_score: f64,
    pub synergies: usize,
    pub total_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FitnessCalculator {
    traits: BTreeMap<String, MutationTraits>,
}

impl FitnessCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    fn traits(&mut self, parser: &mut CatalogParser, mutation_id: &str) -> MutationTraits {
        if let Some(traits) = self.traits.get(mutation_id) {
            return *traits;
        }
        let traits = parser
            .parse(mutation_id)
            .map(|m| MutationTraits {
                spread: m.has_spread_effect(),
                positive_only: m.has_only_positive_effects(),
            })
            .unwrap_or(MutationTraits {
                spread: false,
                positive_only: false,
            });
        self.traits.insert(mutation_id.to_string(), traits);
        traits
    }

    /// Evaluate a layout against the requested instance count.
    pub fn evaluate(
        &mut self,
        state: &State,
        requested: usize,
        parser: &mut CatalogParser,
    ) -> ScoreBreakdown {
        let placed = state.placements.len();
        let total_crops = state.crops.len();
        let shared_crops = state.crops.shared_count();

        let anchors: Vec<_> = state
            .placements
            .iter()
            .map(|(id, p)| (id.clone(), p.mutation_id.clone(), p.footprint.anchor))
            .collect();

        let mut total_distance = 0u64;
        let mut distance_pairs = 0u64;
        for i in 0..anchors.len() {
            for j in (i + 1)..anchors.len() {
                total_distance += anchors[i].2.manhattan(anchors[j].2) as u64;
                distance_pairs += 1;
            }
        }
        let avg_distance = total_distance as f64 / distance_pairs.max(1) as f64;

        // Ordered pairs: a spreads, b is positive-only, anchors within 3.
        let mut synergies = 0usize;
        for (source_id, source_kind, source_anchor) in &anchors {
            if !self.traits(parser, source_kind).spread {
                continue;
            }
            for (other_id, other_kind, other_anchor) in &anchors {
                if other_id == source_id {
                    continue;
                }
                if self.traits(parser, other_kind).positive_only
                    && source_anchor.manhattan(*other_anchor) <= 3
                {
                    synergies += 1;
                }
            }
        }

        let placement_rate = if requested == 0 {
            1.0
        } else {
            placed as f64 / requested as f64
        };
        let compactness_score = (200.0 - 10.0 * avg_distance).max(0.0);
        let shortfall = requested.saturating_sub(placed) as f64;

        let total_score = placement_rate * 2000.0
            + compactness_score
            + 30.0 * shared_crops as f64
            + 20.0 * synergies as f64
            - 3000.0 * shortfall;

        ScoreBreakdown {
            placed,
            requested,
            placement_rate,
            total_crops,
            shared_crops,
            crop_efficiency: shared_crops as f64 / total_crops.max(1) as f64,
            compactness_score,
            synergies,
            total_score,
        }
    }

    /// The scalar alone, for hot paths.
    pub fn score(&mut self, state: &State, requested: usize, parser: &mut CatalogParser) -> f64 {
        self.evaluate(state, requested, parser).total_score
    }
}
