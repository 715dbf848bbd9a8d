//! Construction-time placement scoring. Used by the greedy solver to rank
//! anchors and by the annealer to rank relocation candidates. Weights come
//! from the active strategy profile.

use crate::catalog::{CatalogParser, ParsedMutation};
use crate::garden::{Cell, FeasiblePlacement, State, GRID_SIZE};

/// Weight tuple steering the heuristic scorer. `randomness` is not used by
/// the scorer itself; the solvers consult it to occasionally pick from the
/// top candidates instead of the best.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyProfile {
    pub name: &'static str,
    pub sharing_weight: f64,
    pub compactness_weight: f64,
    pub synergy_weight: f64,
    pub corner_weight: f64,
    pub randomness: f64,
}

impl StrategyProfile {
    const fn new(
        name: &'static str,
        sharing_weight: f64,
        compactness_weight: f64,
        corner_weight: f64,
        randomness: f64,
    ) -> Self {
        Self {
            name,
            sharing_weight,
            compactness_weight,
            synergy_weight: 0.5,
            corner_weight,
            randomness,
        }
    }

    pub fn with_randomness(mut self, randomness: f64) -> Self {
        self.randomness = randomness;
        self
    }
}

impl Default for StrategyProfile {
    fn default() -> Self {
        STRATEGY_PROFILES[0]
    }
}

/// The profiles the multi-strategy optimizer sweeps.
pub const STRATEGY_PROFILES: [StrategyProfile; 5] = [
    StrategyProfile::new("compact-balanced", 1.0, 2.0, 1.0, 0.0),
    StrategyProfile::new("ultra-compact", 0.5, 3.0, 0.5, 0.0),
    StrategyProfile::new("compact-sharing", 1.5, 2.0, 0.5, 0.0),
    StrategyProfile::new("tight-cluster", 0.8, 2.5, 1.0, 0.0),
    StrategyProfile::new("exploration", 1.0, 1.5, 1.0, 0.2),
];

/// Score a feasible placement against the current state.
pub fn score_placement(
    state: &State,
    mutation: &ParsedMutation,
    feasible: &FeasiblePlacement,
    profile: &StrategyProfile,
    parser: &mut CatalogParser,
) -> f64 {
    let footprint = mutation.footprint_at(feasible.anchor);
    let (cx, cy) = footprint.center_f64();
    let mut score = 0.0;

    if state.placements.is_empty() {
        // Isolated mutations skip the center pull; their corner bonus is
        // meant to win and keep prime land open.
        if !mutation.isolated {
            let board_mid = (GRID_SIZE as f64 - 1.0) / 2.0;
            let center_dist = (cx - board_mid).abs() + (cy - board_mid).abs();
            score += (50.0 - 5.0 * center_dist).max(0.0) * profile.compactness_weight;
        }
    } else {
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut neighbors = 0u32;
        for (_, placement) in state.placements.iter() {
            let (px, py) = placement.footprint.center_f64();
            sum_x += px;
            sum_y += py;
            if footprint.gap(&placement.footprint) <= 1 {
                neighbors += 1;
            }
        }
        let count = state.placements.len() as f64;
        let dist = (cx - sum_x / count).abs() + (cy - sum_y / count).abs();
        score += (100.0 - 8.0 * dist).max(0.0) * profile.compactness_weight;
        score += 30.0 * profile.compactness_weight * neighbors as f64;
    }

    score += feasible.shared_crop_count() as f64 * profile.sharing_weight * 30.0;

    if mutation.has_spread_effect() {
        for (_, placement) in state.placements.iter() {
            let dist = feasible.anchor.manhattan(placement.footprint.anchor);
            if dist > 3 {
                continue;
            }
            let positive = parser
                .parse(&placement.mutation_id)
                .map(|m| m.has_only_positive_effects())
                .unwrap_or(false);
            if positive {
                score += (4 - dist) as f64 * profile.synergy_weight * 5.0;
            }
        }
    }

    if mutation.isolated {
        let on_x_edge = feasible.anchor.x == 0
            || feasible.anchor.x + mutation.width == GRID_SIZE;
        let on_y_edge = feasible.anchor.y == 0
            || feasible.anchor.y + mutation.height == GRID_SIZE;
        let edges = on_x_edge as u32 + on_y_edge as u32;
        score += edges as f64 * profile.corner_weight * 20.0;
    }

    score += 3.0 * mutation.tier as f64;
    score
}

/// Rank feasible placements best-first, tie-broken by anchor for
/// reproducibility.
pub fn rank_candidates(
    state: &State,
    mutation: &ParsedMutation,
    candidates: Vec<FeasiblePlacement>,
    profile: &StrategyProfile,
    parser: &mut CatalogParser,
) -> Vec<(FeasiblePlacement, f64)> {
    let mut scored: Vec<(FeasiblePlacement, f64)> = candidates
        .into_iter()
        .map(|feasible| {
            let score = score_placement(state, mutation, &feasible, profile, parser);
            (feasible, score)
        })
        .collect();
    scored.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| (a.0.anchor.y, a.0.anchor.x).cmp(&(b.0.anchor.y, b.0.anchor.x)))
    });
    scored
}

/// Pick an index from the top `k` candidates; `randomness` decides whether
/// the pick is uniform over the window or simply the best.
pub fn pick_candidate(
    count: usize,
    top_k: usize,
    randomness: f64,
    rng: &mut super::rng::Rng,
) -> usize {
    if count == 0 {
        return 0;
    }
    if rng.next_bool(randomness) {
        rng.next_below(top_k.min(count))
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::garden::check_placement;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn test_parser() -> CatalogParser {
        let raw = json!({
            "plain": { "name": "Plain", "size": "1x1",
                       "conditions": { "wheat": 1 } },
            "hermit": { "name": "Hermit", "size": "1x1",
                        "conditions": { "adjacent_crops": 0 } },
            "spreader": { "name": "Spreader", "size": "1x1",
                          "effects": ["effect_spread"],
                          "conditions": { "wheat": 1 } },
            "sunny": { "name": "Sunny", "size": "1x1",
                       "effects": ["harvest_boost"],
                       "conditions": { "wheat": 1 } }
        });
        CatalogParser::new(serde_json::from_value::<Catalog>(raw).unwrap())
    }

    #[test]
    fn first_placement_prefers_board_center() {
        let mut parser = test_parser();
        let state = State::with_full_board();
        let m = parser.parse("plain").unwrap();
        let profile = StrategyProfile::default();

        let central = check_placement(&state, &m, Cell::new(4, 4)).unwrap();
        let corner = check_placement(&state, &m, Cell::new(0, 0)).unwrap();
        let central_score = score_placement(&state, &m, &central, &profile, &mut parser);
        let corner_score = score_placement(&state, &m, &corner, &profile, &mut parser);
        assert!(central_score > corner_score);
    }

    #[test]
    fn sharing_raises_the_score() {
        let mut parser = test_parser();
        let mut state = State::with_full_board();
        let m = parser.parse("plain").unwrap();
        let profile = StrategyProfile::default();

        let first = check_placement(&state, &m, Cell::new(4, 4)).unwrap();
        crate::garden::placer::execute(&mut state, &m, &first, "plain_0");

        // Anchor next to the planted wheat shares it; a remote anchor does not.
        let near = check_placement(&state, &m, Cell::new(2, 2)).unwrap();
        let far = check_placement(&state, &m, Cell::new(8, 8)).unwrap();
        assert!(near.shared_crop_count() > 0);
        let near_score = score_placement(&state, &m, &near, &profile, &mut parser);
        let far_score = score_placement(&state, &m, &far, &profile, &mut parser);
        assert!(near_score > far_score);
    }

    #[test]
    fn corner_bonus_applies_to_isolated_mutations_only() {
        let mut parser = test_parser();
        let state = State::with_full_board();
        let hermit = parser.parse("hermit").unwrap();
        let profile = StrategyProfile::default();

        let corner = check_placement(&state, &hermit, Cell::new(0, 0)).unwrap();
        let interior = check_placement(&state, &hermit, Cell::new(5, 4)).unwrap();
        let corner_score = score_placement(&state, &hermit, &corner, &profile, &mut parser);
        let interior_score =
            score_placement(&state, &hermit, &interior, &profile, &mut parser);
        // Isolated mutations get no center pull, so the two edge bonuses win.
        assert!(corner_score > interior_score);
        let edge_bonus = 2.0 * profile.corner_weight * 20.0;
        assert!(corner_score >= edge_bonus);
    }

    #[test]
    fn spread_synergy_rewards_nearby_positive_neighbors() {
        let mut parser = test_parser();
        let mut state = State::with_full_board();
        let sunny = parser.parse("sunny").unwrap();
        let first = check_placement(&state, &sunny, Cell::new(4, 4)).unwrap();
        crate::garden::placer::execute(&mut state, &sunny, &first, "sunny_0");

        let spreader = parser.parse("spreader").unwrap();
        let profile = StrategyProfile::default();
        let near = check_placement(&state, &spreader, Cell::new(4, 6)).unwrap();
        let near_score = score_placement(&state, &spreader, &near, &profile, &mut parser);

        let plain = parser.parse("plain").unwrap();
        let near_plain = check_placement(&state, &plain, Cell::new(4, 6)).unwrap();
        let plain_score = score_placement(&state, &plain, &near_plain, &profile, &mut parser);
        // Same geometry, same sharing; only the synergy term differs (tier equal).
        assert!(near_score > plain_score);
    }

    #[test]
    fn ranked_candidates_are_sorted_and_stable() {
        let mut parser = test_parser();
        let state = State::with_full_board();
        let m = parser.parse("plain").unwrap();
        let profile = StrategyProfile::default();
        let candidates = crate::garden::feasible_anchors(&state, &m);
        let ranked = rank_candidates(&state, &m, candidates, &profile, &mut parser);
        for pair in ranked.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn zero_randomness_always_picks_the_best() {
        let mut rng = super::super::rng::Rng::new(1);
        for _ in 0..50 {
            assert_eq!(pick_candidate(10, 3, 0.0, &mut rng), 0);
        }
    }
}
