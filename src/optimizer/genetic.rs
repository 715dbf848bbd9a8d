//! Genetic layer: a small population of greedy seeds evolved by positional
//! crossover and a relocate mutation operator. The winner goes on to
//! annealing refinement in the multi-strategy driver.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{CatalogError, CatalogParser};
use crate::garden::{check_placement, feasible_anchors, placer, Cell, State};

use super::fitness::FitnessCalculator;
use super::greedy::{expand_workload, place_instances, InstanceSpec};
use super::rng::Rng;
use super::scoring::{rank_candidates, score_placement, StrategyProfile};

#[derive(Debug, Clone, Copy)]
pub struct GeneticParams {
    pub population: usize,
    pub generations: usize,
    pub elite: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub tournament: usize,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            population: 8,
            generations: 15,
            elite: 2,
            crossover_rate: 0.7,
            mutation_rate: 0.3,
            tournament: 3,
        }
    }
}

/// Randomness levels seeding the initial population.
const SEED_RANDOMNESS: [f64; 8] = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];

/// Evolve a layout for the workload. Returns the fittest chromosome.
#[allow(clippy::too_many_arguments)]
pub fn evolve_layout(
    parser: &mut CatalogParser,
    fitness: &mut FitnessCalculator,
    workload: &BTreeMap<String, u32>,
    unlocked: &BTreeSet<Cell>,
    profile: &StrategyProfile,
    target: usize,
    params: &GeneticParams,
    rng: &mut Rng,
) -> Result<State, CatalogError> {
    let specs = expand_workload(parser, workload)?;

    let mut population: Vec<(State, f64)> = Vec::with_capacity(params.population);
    for i in 0..params.population {
        let seeded = profile.with_randomness(SEED_RANDOMNESS[i % SEED_RANDOMNESS.len()]);
        let mut state = State::new(unlocked);
        place_instances(&mut state, &specs, &seeded, parser, rng);
        let score = fitness.score(&state, target, parser);
        population.push((state, score));
    }
    sort_population(&mut population);

    for _ in 0..params.generations {
        let mut next: Vec<(State, f64)> = population
            .iter()
            .take(params.elite)
            .cloned()
            .collect();

        while next.len() < params.population {
            let parent_index = tournament(&population, params.tournament, rng);
            let mut child = if rng.next_bool(params.crossover_rate) {
                let partner_index = tournament(&population, params.tournament, rng);
                crossover(
                    &population[parent_index].0,
                    &population[partner_index].0,
                    &specs,
                    unlocked,
                    profile,
                    parser,
                )
            } else {
                population[parent_index].0.clone()
            };
            if rng.next_bool(params.mutation_rate) {
                mutate(&mut child, profile, parser, rng);
            }
            let score = fitness.score(&child, target, parser);
            next.push((child, score));
        }

        population = next;
        sort_population(&mut population);
    }

    Ok(population.remove(0).0)
}

fn sort_population(population: &mut [(State, f64)]) {
    population.sort_by(|a, b| b.1.total_cmp(&a.1));
}

fn tournament(population: &[(State, f64)], size: usize, rng: &mut Rng) -> usize {
    let mut winner = rng.next_below(population.len());
    for _ in 1..size {
        let challenger = rng.next_below(population.len());
        if population[challenger].1 > population[winner].1 {
            winner = challenger;
        }
    }
    winner
}

/// Positional crossover: walk the instance order; for each instance try the
/// partner's anchor, then the primary parent's, falling back to the full
/// anchor scan, and keep the best-scoring feasible option.
fn crossover(
    primary: &State,
    partner: &State,
    specs: &[InstanceSpec],
    unlocked: &BTreeSet<Cell>,
    profile: &StrategyProfile,
    parser: &mut CatalogParser,
) -> State {
    let mut child = State::new(unlocked);
    for spec in specs {
        let inherited: Vec<Cell> = [partner, primary]
            .iter()
            .filter_map(|parent| {
                parent
                    .placements
                    .get(&spec.instance_id)
                    .map(|p| p.footprint.anchor)
            })
            .collect();

        let mut candidates: Vec<_> = inherited
            .into_iter()
            .filter_map(|anchor| check_placement(&child, &spec.mutation, anchor))
            .collect();
        if candidates.is_empty() {
            candidates = feasible_anchors(&child, &spec.mutation);
        }
        if candidates.is_empty() {
            continue;
        }

        let best = candidates
            .into_iter()
            .map(|feasible| {
                let score =
                    score_placement(&child, &spec.mutation, &feasible, profile, parser);
                (feasible, score)
            })
            .max_by(|a, b| {
                a.1.total_cmp(&b.1).then_with(|| {
                    (b.0.anchor.y, b.0.anchor.x).cmp(&(a.0.anchor.y, a.0.anchor.x))
                })
            })
            .map(|(feasible, _)| feasible)
            .expect("candidates checked non-empty");
        placer::execute(&mut child, &spec.mutation, &best, &spec.instance_id);
    }
    child
}

/// Mutation operator: relocate one random placement to one of its five best
/// feasible anchors.
fn mutate(
    state: &mut State,
    profile: &StrategyProfile,
    parser: &mut CatalogParser,
    rng: &mut Rng,
) {
    if state.placements.is_empty() {
        return;
    }
    let ids = state.placements.ids();
    let instance_id = ids[rng.next_below(ids.len())].clone();
    let Some(original) = placer::remove(state, &instance_id) else {
        return;
    };
    let Ok(mutation) = parser.parse(&original.mutation_id) else {
        placer::restore(state, &original);
        return;
    };

    let candidates = feasible_anchors(state, &mutation);
    if candidates.is_empty() {
        placer::restore(state, &original);
        return;
    }
    let ranked = rank_candidates(state, &mutation, candidates, profile, parser);
    let index = rng.next_below(5.min(ranked.len()));
    placer::execute(state, &mutation, &ranked[index].0, &instance_id);

    // Moving a dependency provider may strand a dependent; put it back.
    if !crate::garden::deps_satisfied(state, parser) {
        placer::remove(state, &instance_id);
        placer::restore(state, &original);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::garden::{audit_state, full_unlocked};
    use serde_json::json;

    fn parser() -> CatalogParser {
        let raw = json!({
            "berry": { "name": "Berry", "size": "1x1",
                       "conditions": { "wheat": 1 } },
            "oak": { "name": "Oak", "size": "2x2",
                     "conditions": { "potato": 1 } }
        });
        CatalogParser::new(serde_json::from_value::<Catalog>(raw).unwrap())
    }

    fn small_params() -> GeneticParams {
        GeneticParams {
            population: 4,
            generations: 3,
            ..GeneticParams::default()
        }
    }

    #[test]
    fn evolved_layout_is_sound_and_complete_on_easy_input() {
        let mut parser = parser();
        let mut fitness = FitnessCalculator::new();
        let workload: BTreeMap<String, u32> =
            [("berry".to_string(), 4), ("oak".to_string(), 1)].into();
        let mut rng = Rng::new(21);

        let state = evolve_layout(
            &mut parser,
            &mut fitness,
            &workload,
            &full_unlocked(),
            &StrategyProfile::default(),
            5,
            &small_params(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(state.placement_count(), 5);
        assert!(audit_state(&state, &mut parser).is_empty());
    }

    #[test]
    fn evolution_is_deterministic_for_a_seed() {
        let workload: BTreeMap<String, u32> = [("berry".to_string(), 3)].into();
        let run = || {
            let mut parser = parser();
            let mut fitness = FitnessCalculator::new();
            let mut rng = Rng::new(77);
            evolve_layout(
                &mut parser,
                &mut fitness,
                &workload,
                &full_unlocked(),
                &StrategyProfile::default(),
                3,
                &small_params(),
                &mut rng,
            )
            .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn evolution_never_underperforms_its_seeds() {
        let mut parser = parser();
        let mut fitness = FitnessCalculator::new();
        let workload: BTreeMap<String, u32> = [("berry".to_string(), 6)].into();
        let mut rng = Rng::new(5);

        let specs = expand_workload(&mut parser, &workload).unwrap();
        let mut seed_state = State::new(&full_unlocked());
        place_instances(
            &mut seed_state,
            &specs,
            &StrategyProfile::default(),
            &mut parser,
            &mut rng,
        );
        let seed_score = fitness.score(&seed_state, 6, &mut parser);

        let mut rng = Rng::new(5);
        let evolved = evolve_layout(
            &mut parser,
            &mut fitness,
            &workload,
            &full_unlocked(),
            &StrategyProfile::default(),
            6,
            &small_params(),
            &mut rng,
        )
        .unwrap();
        let evolved_score = fitness.score(&evolved, 6, &mut parser);
        assert!(evolved_score >= seed_score);
    }
}
