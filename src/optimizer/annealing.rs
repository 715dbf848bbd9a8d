//! Simulated annealing over a constructed layout. Moves relocate single
//! placements or swap same-size pairs; acceptance is Metropolis on the
//! global fitness. A short tabu list keeps relocations from oscillating,
//! cooling adapts to the acceptance ratio, and bounded reheats escape
//! plateaus. Returns the best state encountered.

use crate::catalog::CatalogParser;
use crate::garden::{check_placement, feasible_anchors, placer, Cell, Placement, State};

use super::fitness::FitnessCalculator;
use super::progress::{report_interval, Progress};
use super::rng::Rng;
use super::scoring::{rank_candidates, StrategyProfile};

const SWAP_PROBABILITY: f64 = 0.3;
const RELOCATE_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct AnnealingParams {
    pub initial_temperature: f64,
    pub floor_temperature: f64,
    pub iterations_per_step: u32,
    pub base_cooling: f64,
    pub reheat_threshold: u32,
    pub reheat_factor: f64,
    pub max_reheats: u32,
    pub convergence_threshold: u32,
    pub tabu_capacity: u64,
}

impl Default for AnnealingParams {
    fn default() -> Self {
        Self {
            initial_temperature: 100.0,
            floor_temperature: 0.01,
            iterations_per_step: 30,
            base_cooling: 0.97,
            reheat_threshold: 50,
            reheat_factor: 0.5,
            max_reheats: 3,
            convergence_threshold: 100,
            tabu_capacity: 10,
        }
    }
}

impl AnnealingParams {
    /// Rough iteration budget, for progress cadence only.
    fn iteration_estimate(&self) -> usize {
        let steps = ((self.floor_temperature / self.initial_temperature).ln()
            / self.base_cooling.ln())
        .ceil()
        .max(1.0) as usize;
        steps * self.iterations_per_step as usize * (1 + self.max_reheats as usize)
    }
}

#[derive(Debug, Clone)]
struct TabuEntry {
    instance_id: String,
    anchor: Cell,
    expires: u64,
}

enum Move {
    Relocate {
        instance_id: String,
        original: Placement,
        new_anchor: Cell,
    },
    Swap {
        first_id: String,
        second_id: String,
        original_first: Placement,
        original_second: Placement,
    },
}

/// Anneal a layout. The progress callback fires on a fixed cadence; a
/// `false` return aborts and yields the best state seen so far.
#[allow(clippy::too_many_arguments)]
pub fn refine_layout<F>(
    mut state: State,
    target: usize,
    profile: &StrategyProfile,
    params: &AnnealingParams,
    parser: &mut CatalogParser,
    fitness: &mut FitnessCalculator,
    rng: &mut Rng,
    mut on_progress: F,
) -> State
where
    F: FnMut(&Progress) -> bool,
{
    let mut current_score = fitness.score(&state, target, parser);
    let mut best = state.clone();
    let mut best_score = current_score;
    if state.placements.is_empty() {
        return best;
    }

    let max_iter = params.iteration_estimate();
    let interval = report_interval(max_iter) as u64;

    let mut temperature = params.initial_temperature;
    let mut cooling = params.base_cooling;
    let mut tabu: Vec<TabuEntry> = Vec::new();
    let mut iter: u64 = 0;
    let mut idle: u32 = 0;
    let mut reheats: u32 = 0;
    let mut accepted: u32 = 0;
    let mut attempted: u32 = 0;

    while temperature > params.floor_temperature {
        for _ in 0..params.iterations_per_step {
            iter += 1;
            tabu.retain(|entry| entry.expires > iter);

            let attempt = if state.placements.len() >= 2 && rng.next_f64() < SWAP_PROBABILITY {
                try_swap(&mut state, parser, &tabu, rng)
            } else {
                try_relocate(&mut state, parser, profile, &tabu, rng)
            };

            // A move that strands a dependent placement is not a move.
            let attempt = attempt.and_then(|applied| {
                if crate::garden::deps_satisfied(&state, parser) {
                    Some(applied)
                } else {
                    undo(&mut state, applied);
                    None
                }
            });

            let mut improved_best = false;
            if let Some(applied) = attempt {
                attempted += 1;
                let new_score = fitness.score(&state, target, parser);
                let delta = new_score - current_score;
                let accept = delta > 0.0 || rng.next_f64() < (delta / temperature).exp();
                if accept {
                    accepted += 1;
                    current_score = new_score;
                    if let Move::Relocate {
                        instance_id,
                        new_anchor,
                        ..
                    } = &applied
                    {
                        tabu.push(TabuEntry {
                            instance_id: instance_id.clone(),
                            anchor: *new_anchor,
                            expires: iter + params.tabu_capacity,
                        });
                    }
                    if new_score > best_score {
                        best_score = new_score;
                        best = state.clone();
                        improved_best = true;
                    }
                } else {
                    undo(&mut state, applied);
                }
            }

            idle = if improved_best { 0 } else { idle + 1 };
            if attempted > 100 {
                attempted /= 2;
                accepted /= 2;
            }

            if idle >= params.reheat_threshold && reheats < params.max_reheats {
                temperature = params.initial_temperature
                    * params.reheat_factor
                    * 0.7_f64.powi(reheats as i32);
                reheats += 1;
                tabu.clear();
                idle = 0;
                accepted = 0;
                attempted = 0;
            }

            if iter % interval == 0 {
                let keep_going = on_progress(&Progress {
                    iter: iter as usize,
                    max_iter,
                    current_score,
                    best_score,
                    temperature,
                    placed_count: state.placements.len(),
                });
                if !keep_going {
                    return best;
                }
            }

            if idle >= params.convergence_threshold && reheats >= params.max_reheats {
                return best;
            }
        }

        if attempted > 0 {
            let ratio = accepted as f64 / attempted as f64;
            if ratio > 0.5 {
                cooling *= 0.98;
            } else if ratio < 0.1 && temperature > 10.0 * params.floor_temperature {
                cooling = (cooling * 1.01).min(0.9999);
            } else {
                cooling = params.base_cooling;
            }
        }
        temperature *= cooling;
    }

    best
}

fn is_tabu(tabu: &[TabuEntry], instance_id: &str, anchor: Cell) -> bool {
    tabu.iter()
        .any(|entry| entry.instance_id == instance_id && entry.anchor == anchor)
}

/// Remove a random placement and re-place it at one of its five best
/// feasible anchors. Restores the original and reports no move when nothing
/// non-tabu is feasible.
fn try_relocate(
    state: &mut State,
    parser: &mut CatalogParser,
    profile: &StrategyProfile,
    tabu: &[TabuEntry],
    rng: &mut Rng,
) -> Option<Move> {
    let ids = state.placements.ids();
    let instance_id = ids[rng.next_below(ids.len())].clone();
    let original = placer::remove(state, &instance_id)?;

    let Ok(mutation) = parser.parse(&original.mutation_id) else {
        placer::restore(state, &original);
        return None;
    };

    let candidates: Vec<_> = feasible_anchors(state, &mutation)
        .into_iter()
        .filter(|f| !is_tabu(tabu, &instance_id, f.anchor))
        .collect();
    if candidates.is_empty() {
        placer::restore(state, &original);
        return None;
    }

    let ranked = rank_candidates(state, &mutation, candidates, profile, parser);
    let index = rng.next_below(RELOCATE_WINDOW.min(ranked.len()));
    let chosen = &ranked[index].0;
    let new_anchor = chosen.anchor;
    placer::execute(state, &mutation, chosen, &instance_id);

    Some(Move::Relocate {
        instance_id,
        original,
        new_anchor,
    })
}

/// Swap the anchors of two same-size placements. Rolls back and reports no
/// move if either endpoint is infeasible or tabu.
fn try_swap(
    state: &mut State,
    parser: &mut CatalogParser,
    tabu: &[TabuEntry],
    rng: &mut Rng,
) -> Option<Move> {
    let ids = state.placements.ids();
    let first_id = ids[rng.next_below(ids.len())].clone();
    let first_size = {
        let p = state.placements.get(&first_id)?;
        (p.footprint.width, p.footprint.height)
    };
    let partners: Vec<String> = ids
        .iter()
        .filter(|id| **id != first_id)
        .filter(|id| {
            state
                .placements
                .get(id)
                .map(|p| (p.footprint.width, p.footprint.height) == first_size)
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    if partners.is_empty() {
        return None;
    }
    let second_id = partners[rng.next_below(partners.len())].clone();

    let first_anchor = state.placements.get(&first_id)?.footprint.anchor;
    let second_anchor = state.placements.get(&second_id)?.footprint.anchor;
    if is_tabu(tabu, &first_id, second_anchor) || is_tabu(tabu, &second_id, first_anchor) {
        return None;
    }

    let original_first = placer::remove(state, &first_id)?;
    let original_second = placer::remove(state, &second_id)?;

    let first_mutation = parser.parse(&original_first.mutation_id).ok();
    let second_mutation = parser.parse(&original_second.mutation_id).ok();
    let (Some(first_mutation), Some(second_mutation)) = (first_mutation, second_mutation) else {
        placer::restore(state, &original_second);
        placer::restore(state, &original_first);
        return None;
    };

    if let Some(feasible) = check_placement(state, &first_mutation, second_anchor) {
        placer::execute(state, &first_mutation, &feasible, &first_id);
    } else {
        placer::restore(state, &original_second);
        placer::restore(state, &original_first);
        return None;
    }

    if let Some(feasible) = check_placement(state, &second_mutation, first_anchor) {
        placer::execute(state, &second_mutation, &feasible, &second_id);
    } else {
        placer::remove(state, &first_id);
        placer::restore(state, &original_second);
        placer::restore(state, &original_first);
        return None;
    }

    Some(Move::Swap {
        first_id,
        second_id,
        original_first,
        original_second,
    })
}

fn undo(state: &mut State, applied: Move) {
    match applied {
        Move::Relocate {
            instance_id,
            original,
            ..
        } => {
            placer::remove(state, &instance_id);
            placer::restore(state, &original);
        }
        Move::Swap {
            first_id,
            second_id,
            original_first,
            original_second,
        } => {
            placer::remove(state, &first_id);
            placer::remove(state, &second_id);
            placer::restore(state, &original_first);
            placer::restore(state, &original_second);
        }
    }
}
