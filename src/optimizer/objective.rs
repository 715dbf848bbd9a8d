//! Objective-driven search: instead of satisfying a wishlist, choose any
//! mutations from an allowed pool and anneal toward a domain objective
//! (placement count or profit). Moves add, remove, relocate, or substitute
//! placements; rollback restores the exact prior configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogError, CatalogParser, ParsedMutation};
use crate::garden::{check_placement, placer, Cell, Placement, State};
use crate::parallel::batch_ranges;

use super::progress::Progress;
use super::rng::Rng;

/// Number of progress-reporting batches per run: one history point and one
/// cancellation check per batch.
const PROGRESS_BATCH_COUNT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    MaxCount,
    MaxProfit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveConfig {
    pub max_iterations: usize,
    pub start_temperature: f64,
    pub cooling_rate: f64,
    pub objective: Objective,
}

impl ObjectiveConfig {
    /// Fast preview runs.
    pub fn quick(objective: Objective) -> Self {
        Self {
            max_iterations: 1000,
            start_temperature: 50.0,
            cooling_rate: 0.99,
            objective,
        }
    }

    /// The default trade-off.
    pub fn standard(objective: Objective) -> Self {
        Self {
            max_iterations: 20_000,
            start_temperature: 200.0,
            cooling_rate: 0.9995,
            objective,
        }
    }

    /// Long, patient searches.
    pub fn thorough(objective: Objective) -> Self {
        Self {
            max_iterations: 50_000,
            start_temperature: 500.0,
            cooling_rate: 0.9999,
            objective,
        }
    }
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self::standard(Objective::MaxCount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub iter: usize,
    pub score: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone)]
pub struct ObjectiveOutcome {
    pub state: State,
    pub iterations: usize,
    pub final_score: f64,
    pub best_score: f64,
    pub history: Vec<HistoryPoint>,
}

/// Value one placement contributes to the objective.
fn placement_value(mutation: &ParsedMutation, objective: Objective) -> f64 {
    match objective {
        Objective::MaxCount => {
            1.0 + 0.25 * mutation.tier as f64 + 0.1 * mutation.area() as f64
        }
        Objective::MaxProfit => {
            let drops: f64 = mutation.drops.values().sum();
            let effects: f64 = mutation.effects.iter().map(|e| e.profit_weight()).sum();
            0.01 * drops + effects + 10.0 * mutation.tier as f64
        }
    }
}

struct Pool {
    mutations: Vec<Arc<ParsedMutation>>,
    by_id: BTreeMap<String, Arc<ParsedMutation>>,
    /// Tier-weighted sampling weights, aligned with `mutations`.
    weights: Vec<f64>,
}

impl Pool {
    /// Parse and filter the allowed ids: special conditions are out, and
    /// mutations whose dependencies the pool cannot provide are dropped
    /// transitively.
    fn build(parser: &mut CatalogParser, allowed: &[String]) -> Result<Pool, CatalogError> {
        let mut kept: BTreeMap<String, Arc<ParsedMutation>> = BTreeMap::new();
        for id in allowed {
            let mutation = parser.parse(id)?;
            if !mutation.special {
                kept.insert(id.clone(), mutation);
            }
        }

        loop {
            // Isolated mutations keep an empty ring, so their parsed deps
            // never bind and cannot disqualify them from the pool.
            let unsatisfied: Vec<String> = kept
                .values()
                .filter(|m| {
                    !m.isolated && m.deps.keys().any(|dep| !kept.contains_key(dep))
                })
                .map(|m| m.id.clone())
                .collect();
            if unsatisfied.is_empty() {
                break;
            }
            for id in unsatisfied {
                kept.remove(&id);
            }
        }

        let mutations: Vec<Arc<ParsedMutation>> = kept.values().cloned().collect();
        let weights = mutations
            .iter()
            .map(|m| 1.0 + 0.5 * m.tier as f64)
            .collect();
        Ok(Pool {
            by_id: kept,
            mutations,
            weights,
        })
    }

    fn sample(&self, rng: &mut Rng) -> &Arc<ParsedMutation> {
        let total: f64 = self.weights.iter().sum();
        let mut roll = rng.next_f64() * total;
        for (mutation, weight) in self.mutations.iter().zip(&self.weights) {
            roll -= weight;
            if roll <= 0.0 {
                return mutation;
            }
        }
        self.mutations.last().expect("pool is non-empty")
    }

    fn same_size_alternatives(&self, placement: &Placement) -> Vec<&Arc<ParsedMutation>> {
        self.mutations
            .iter()
            .filter(|m| {
                m.id != placement.mutation_id
                    && (m.width, m.height)
                        == (placement.footprint.width, placement.footprint.height)
            })
            .collect()
    }
}

fn score_state(state: &State, pool: &Pool, objective: Objective) -> f64 {
    state
        .placements
        .iter()
        .filter_map(|(_, p)| pool.by_id.get(&p.mutation_id))
        .map(|m| placement_value(m, objective))
        .sum()
}

enum Undo {
    Added { instance_id: String },
    Removed { original: Placement },
    Moved { instance_id: String, original: Placement },
    Swapped { new_id: String, original: Placement },
}

fn revert(state: &mut State, undo: Undo) {
    match undo {
        Undo::Added { instance_id } => {
            placer::remove(state, &instance_id);
        }
        Undo::Removed { original } => placer::restore(state, &original),
        Undo::Moved {
            instance_id,
            original,
        } => {
            placer::remove(state, &instance_id);
            placer::restore(state, &original);
        }
        Undo::Swapped { new_id, original } => {
            placer::remove(state, &new_id);
            placer::restore(state, &original);
        }
    }
}

struct Search<'p> {
    pool: &'p Pool,
    counters: BTreeMap<String, u32>,
}

impl<'p> Search<'p> {
    fn new(pool: &'p Pool) -> Self {
        Self {
            pool,
            counters: BTreeMap::new(),
        }
    }

    fn fresh_id(&mut self, mutation_id: &str) -> String {
        let counter = self.counters.entry(mutation_id.to_string()).or_insert(0);
        let id = format!("{mutation_id}_{counter}");
        *counter += 1;
        id
    }

    /// Seed the board with dependency-free mutations, highest tier first.
    /// Count-maximizing runs break tier ties smaller-footprint-first.
    fn greedy_seed(&mut self, state: &mut State, objective: Objective) {
        let mut croppers: Vec<&Arc<ParsedMutation>> = self
            .pool
            .mutations
            .iter()
            .filter(|m| m.deps.is_empty())
            .collect();
        croppers.sort_by(|a, b| {
            let tiers = b.tier.cmp(&a.tier);
            match objective {
                Objective::MaxCount => tiers
                    .then(a.area().cmp(&b.area()))
                    .then(a.id.cmp(&b.id)),
                Objective::MaxProfit => tiers.then(a.id.cmp(&b.id)),
            }
        });

        for mutation in croppers {
            loop {
                let Some(feasible) = first_fit(state, mutation) else {
                    break;
                };
                let instance_id = self.fresh_id(&mutation.id);
                placer::execute(state, mutation, &feasible, &instance_id);
            }
        }
    }

    fn try_add(&mut self, state: &mut State, rng: &mut Rng) -> Option<Undo> {
        let mutation = self.pool.sample(rng).clone();
        let mut cells = state.board.free_cells();
        rng.shuffle(&mut cells);
        for anchor in cells {
            if let Some(feasible) = check_placement(state, &mutation, anchor) {
                let instance_id = self.fresh_id(&mutation.id);
                placer::execute(state, &mutation, &feasible, &instance_id);
                return Some(Undo::Added { instance_id });
            }
        }
        None
    }

    fn try_remove(&mut self, state: &mut State, rng: &mut Rng) -> Option<Undo> {
        let ids = state.placements.ids();
        if ids.is_empty() {
            return None;
        }
        let victim = ids[rng.next_below(ids.len())].clone();
        let original = placer::remove(state, &victim)?;
        Some(Undo::Removed { original })
    }

    fn try_move(&mut self, state: &mut State, rng: &mut Rng) -> Option<Undo> {
        let ids = state.placements.ids();
        if ids.is_empty() {
            return None;
        }
        let instance_id = ids[rng.next_below(ids.len())].clone();
        let original = placer::remove(state, &instance_id)?;
        let Some(mutation) = self.pool.by_id.get(&original.mutation_id).cloned() else {
            placer::restore(state, &original);
            return None;
        };

        let mut cells = state.board.free_cells();
        rng.shuffle(&mut cells);
        for anchor in cells {
            if anchor == original.footprint.anchor {
                continue;
            }
            if let Some(feasible) = check_placement(state, &mutation, anchor) {
                placer::execute(state, &mutation, &feasible, &instance_id);
                return Some(Undo::Moved {
                    instance_id,
                    original,
                });
            }
        }
        placer::restore(state, &original);
        None
    }

    fn try_swap(&mut self, state: &mut State, rng: &mut Rng) -> Option<Undo> {
        let ids = state.placements.ids();
        if ids.is_empty() {
            return None;
        }
        let victim_id = ids[rng.next_below(ids.len())].clone();
        let victim = state.placements.get(&victim_id)?.clone();
        let alternatives = self.pool.same_size_alternatives(&victim);
        if alternatives.is_empty() {
            return None;
        }
        let replacement = alternatives[rng.next_below(alternatives.len())].clone();
        let anchor = victim.footprint.anchor;

        let original = placer::remove(state, &victim_id)?;
        if let Some(feasible) = check_placement(state, &replacement, anchor) {
            let new_id = self.fresh_id(&replacement.id);
            placer::execute(state, &replacement, &feasible, &new_id);
            Some(Undo::Swapped { new_id, original })
        } else {
            placer::restore(state, &original);
            None
        }
    }
}

/// First feasible anchor in board order.
fn first_fit(
    state: &State,
    mutation: &ParsedMutation,
) -> Option<crate::garden::FeasiblePlacement> {
    for y in 0..=(crate::garden::GRID_SIZE - mutation.height) {
        for x in 0..=(crate::garden::GRID_SIZE - mutation.width) {
            if let Some(feasible) = check_placement(state, mutation, Cell::new(x, y)) {
                return Some(feasible);
            }
        }
    }
    None
}

/// Drop placements whose requirements no longer hold, repeating until the
/// survivors are mutually consistent.
fn validation_sweep(state: &mut State, pool: &Pool) {
    loop {
        let mut bad = Vec::new();
        for (id, placement) in state.placements.iter() {
            let Some(mutation) = pool.by_id.get(&placement.mutation_id) else {
                bad.push(id.clone());
                continue;
            };
            let ring = placement.footprint.ring();
            let crops_ok = mutation.crops.iter().all(|(crop, &required)| {
                let have = ring
                    .iter()
                    .filter(|cell| {
                        state.crops.get(**cell).is_some_and(|r| {
                            r.crop == *crop && r.serving.contains(id)
                        })
                    })
                    .count() as u32;
                have >= required
            });
            let deps_ok = mutation.isolated
                || mutation.deps.iter().all(|(dep, &required)| {
                    let mut seen = BTreeSet::new();
                    for cell in &ring {
                        if let Some(instance) = state.placements.instance_at(*cell) {
                            if state
                                .placements
                                .get(instance)
                                .is_some_and(|p| p.mutation_id == *dep)
                            {
                                seen.insert(instance.to_string());
                            }
                        }
                    }
                    seen.len() as u32 >= required
                });
            let isolation_ok = !mutation.isolated
                || ring.iter().all(|cell| {
                    !state.crops.has_crop(*cell)
                        && state.placements.instance_at(*cell).is_none()
                });
            if !(crops_ok && deps_ok && isolation_ok) {
                bad.push(id.clone());
            }
        }
        if bad.is_empty() {
            break;
        }
        for id in bad {
            placer::remove(state, &id);
        }
    }
}

/// Run the objective search. An all-special or dependency-starved pool
/// yields an empty state with zero iterations; cancellation through the
/// progress callback returns the best state seen.
pub fn optimize_layout<F>(
    parser: &mut CatalogParser,
    unlocked: &BTreeSet<Cell>,
    allowed: &[String],
    config: &ObjectiveConfig,
    seed: u64,
    mut on_progress: F,
) -> Result<ObjectiveOutcome, CatalogError>
where
    F: FnMut(&Progress) -> bool,
{
    let pool = Pool::build(parser, allowed)?;
    if pool.mutations.is_empty() {
        return Ok(ObjectiveOutcome {
            state: State::new(unlocked),
            iterations: 0,
            final_score: 0.0,
            best_score: 0.0,
            history: Vec::new(),
        });
    }

    let mut search = Search::new(&pool);
    let mut state = State::new(unlocked);
    search.greedy_seed(&mut state, config.objective);

    let mut rng = Rng::new(seed);
    let mut current_score = score_state(&state, &pool, config.objective);
    let mut best = state.clone();
    let mut best_score = current_score;

    let mut history = Vec::new();
    let mut temperature = config.start_temperature;
    let mut iterations = 0usize;

    // Progress batches: one history point and one abort check per range.
    for (start, end) in batch_ranges(config.max_iterations, PROGRESS_BATCH_COUNT) {
        for _ in start..end {
            iterations += 1;

            let roll = rng.next_f64();
            let undo = if state.placements.is_empty() || roll < 0.4 {
                search.try_add(&mut state, &mut rng)
            } else if roll < 0.6 {
                search.try_remove(&mut state, &mut rng)
            } else if roll < 0.8 {
                search.try_move(&mut state, &mut rng)
            } else {
                search.try_swap(&mut state, &mut rng)
            };

            if let Some(undo) = undo {
                let new_score = score_state(&state, &pool, config.objective);
                let delta = new_score - current_score;
                let accept = delta > 0.0 || rng.next_f64() < (delta / temperature).exp();
                if accept {
                    current_score = new_score;
                    if current_score > best_score {
                        best_score = current_score;
                        best = state.clone();
                    }
                } else {
                    revert(&mut state, undo);
                }
            }

            temperature *= config.cooling_rate;
        }

        history.push(HistoryPoint {
            iter: end,
            score: current_score,
            temperature,
        });
        let keep_going = on_progress(&Progress {
            iter: end,
            max_iter: config.max_iterations,
            current_score,
            best_score,
            temperature,
            placed_count: state.placements.len(),
        });
        if !keep_going {
            break;
        }
    }

    let mut state = best;
    validation_sweep(&mut state, &pool);
    state.sweep_unclaimed_crops();
    let final_score = score_state(&state, &pool, config.objective);

    Ok(ObjectiveOutcome {
        state,
        iterations,
        final_score,
        best_score,
        history,
    })
}

/// Chain fixed-size batches, carrying the best state forward, until the
/// callback cancels or `max_batches` runs complete. Each batch restarts the
/// temperature schedule; the best layout only ever improves.
pub fn optimize_layout_batched<F>(
    parser: &mut CatalogParser,
    unlocked: &BTreeSet<Cell>,
    allowed: &[String],
    config: &ObjectiveConfig,
    seed: u64,
    max_batches: usize,
    mut on_progress: F,
) -> Result<ObjectiveOutcome, CatalogError>
where
    F: FnMut(&Progress) -> bool,
{
    let mut cancelled = false;
    let mut combined: Option<ObjectiveOutcome> = None;

    for batch in 0..max_batches {
        if cancelled {
            break;
        }
        let batch_seed = super::rng::mix_seed(seed, &format!("batch-{batch}"));
        let outcome = optimize_layout(
            parser,
            unlocked,
            allowed,
            config,
            batch_seed,
            |progress| {
                let keep_going = on_progress(progress);
                if !keep_going {
                    cancelled = true;
                }
                keep_going
            },
        )?;

        combined = Some(match combined.take() {
            None => outcome,
            Some(mut acc) => {
                acc.iterations += outcome.iterations;
                acc.history.extend(outcome.history);
                if outcome.final_score > acc.final_score {
                    acc.state = outcome.state;
                    acc.final_score = outcome.final_score;
                }
                acc.best_score = acc.best_score.max(outcome.best_score);
                acc
            }
        });
        if outcome_is_empty(&combined) {
            break;
        }
    }

    Ok(combined.unwrap_or(ObjectiveOutcome {
        state: State::new(unlocked),
        iterations: 0,
        final_score: 0.0,
        best_score: 0.0,
        history: Vec::new(),
    }))
}

fn outcome_is_empty(outcome: &Option<ObjectiveOutcome>) -> bool {
    outcome
        .as_ref()
        .is_some_and(|o| o.iterations == 0 && o.state.placements.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::garden::{audit_state, default_unlocked, full_unlocked};
    use serde_json::json;

    fn parser() -> CatalogParser {
        let raw = json!({
            "berry": { "name": "Berry", "size": "1x1", "tier": 2,
                       "effects": ["improved_harvest_boost"],
                       "drops": { "berry": 3.0 },
                       "conditions": { "wheat": 1 } },
            "thorn": { "name": "Thorn", "size": "1x1", "tier": 1,
                       "effects": ["harvest_loss"],
                       "conditions": { "wheat": 1 } },
            "oak": { "name": "Oak", "size": "2x2", "tier": 3,
                     "conditions": { "potato": 1 } },
            "weird": { "name": "Weird", "size": "1x1",
                       "conditions": { "special": "rain" } },
            "chained": { "name": "Chained", "size": "1x1",
                         "conditions": { "weird": 1 } },
            "hermitage": { "name": "Hermitage", "size": "1x1", "tier": 2,
                           "conditions": { "adjacent_crops": 0, "berry": 1 } }
        });
        CatalogParser::new(serde_json::from_value::<Catalog>(raw).unwrap())
    }

    fn allowed(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_special_pool_returns_empty_with_zero_iterations() {
        let mut parser = parser();
        let outcome = optimize_layout(
            &mut parser,
            &full_unlocked(),
            &allowed(&["weird"]),
            &ObjectiveConfig::quick(Objective::MaxCount),
            7,
            |_| true,
        )
        .unwrap();
        assert_eq!(outcome.iterations, 0);
        assert!(outcome.state.placements.is_empty());
    }

    #[test]
    fn pool_filtering_is_transitive() {
        let mut parser = parser();
        // `chained` depends on `weird`, which is special: both must go.
        let pool = Pool::build(&mut parser, &allowed(&["weird", "chained", "berry"])).unwrap();
        assert_eq!(
            pool.mutations.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["berry"]
        );
    }

    #[test]
    fn isolated_mutation_with_parsed_deps_stays_in_pool_and_survives_the_sweep() {
        let mut parser = parser();
        // `hermitage` is isolated but carries a dep condition on `berry`,
        // which is absent from the pool: the dep is moot and must neither
        // filter it out nor let the final sweep erase its placements.
        let pool = Pool::build(&mut parser, &allowed(&["hermitage"])).unwrap();
        assert_eq!(
            pool.mutations.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["hermitage"]
        );

        let outcome = optimize_layout(
            &mut parser,
            &full_unlocked(),
            &allowed(&["hermitage"]),
            &ObjectiveConfig::quick(Objective::MaxCount),
            4,
            |_| true,
        )
        .unwrap();
        assert!(!outcome.state.placements.is_empty());
        assert!(outcome
            .state
            .placements
            .iter()
            .all(|(_, p)| p.isolated));
        assert!(audit_state(&outcome.state, &mut parser).is_empty());
    }

    #[test]
    fn count_objective_fills_the_starter_plot() {
        let mut parser = parser();
        let outcome = optimize_layout(
            &mut parser,
            &default_unlocked(),
            &allowed(&["berry", "oak"]),
            &ObjectiveConfig::quick(Objective::MaxCount),
            3,
            |_| true,
        )
        .unwrap();
        assert!(outcome.state.placements.len() >= 1);
        assert!(outcome.final_score > 0.0);
        assert!(audit_state(&outcome.state, &mut parser).is_empty());
        assert!(outcome.best_score >= outcome.final_score - 1e-9);
    }

    #[test]
    fn profit_objective_beats_its_greedy_seed() {
        let mut parser = parser();
        let pool = Pool::build(&mut parser, &allowed(&["berry", "thorn"])).unwrap();
        let mut search = Search::new(&pool);
        let mut seed_state = State::new(&default_unlocked());
        search.greedy_seed(&mut seed_state, Objective::MaxProfit);
        let seed_score = score_state(&seed_state, &pool, Objective::MaxProfit);

        let outcome = optimize_layout(
            &mut parser,
            &default_unlocked(),
            &allowed(&["berry", "thorn"]),
            &ObjectiveConfig::standard(Objective::MaxProfit),
            11,
            |_| true,
        )
        .unwrap();
        assert!(outcome.final_score >= seed_score);
        // The loss-bearing mutation is worth 10 - 40 < 0: a profit layout
        // must not keep it.
        assert!(outcome
            .state
            .placements
            .iter()
            .all(|(_, p)| p.mutation_id != "thorn"));
    }

    #[test]
    fn history_and_determinism() {
        let mut parser = parser();
        let config = ObjectiveConfig::quick(Objective::MaxCount);
        let run = |parser: &mut CatalogParser| {
            optimize_layout(
                parser,
                &full_unlocked(),
                &allowed(&["berry"]),
                &config,
                42,
                |_| true,
            )
            .unwrap()
        };
        let a = run(&mut parser);
        let b = run(&mut parser);
        assert_eq!(a.state, b.state);
        assert_eq!(a.history.len(), b.history.len());
        assert_eq!(a.iterations, config.max_iterations);
        assert!(!a.history.is_empty());
    }

    #[test]
    fn cancellation_stops_early_and_returns_a_sound_state() {
        let mut parser = parser();
        let mut calls = 0;
        let outcome = optimize_layout(
            &mut parser,
            &full_unlocked(),
            &allowed(&["berry", "oak"]),
            &ObjectiveConfig::standard(Objective::MaxCount),
            9,
            |_| {
                calls += 1;
                calls < 3
            },
        )
        .unwrap();
        assert!(outcome.iterations < 20_000);
        assert!(audit_state(&outcome.state, &mut parser).is_empty());
    }

    #[test]
    fn batched_runs_accumulate_iterations() {
        let mut parser = parser();
        let config = ObjectiveConfig::quick(Objective::MaxCount);
        let outcome = optimize_layout_batched(
            &mut parser,
            &default_unlocked(),
            &allowed(&["berry"]),
            &config,
            13,
            3,
            |_| true,
        )
        .unwrap();
        assert_eq!(outcome.iterations, 3 * config.max_iterations);
    }
}
