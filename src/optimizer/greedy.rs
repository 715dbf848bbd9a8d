//! Greedy construction: expand the workload into prioritized instances,
//! then place each at its best-scoring feasible anchor. Larger and
//! higher-tier mutations go first; isolated ones last so they only consume
//! leftover space.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::catalog::{CatalogError, CatalogParser, ParsedMutation, GODSEED_ID};
use crate::garden::{feasible_anchors, placer, Cell, State};

use super::rng::Rng;
use super::scoring::{pick_candidate, rank_candidates, StrategyProfile};

/// One instance to place, with its stable id.
#[derive(Debug, Clone)]
pub struct InstanceSpec {
    pub instance_id: String,
    pub mutation: Arc<ParsedMutation>,
}

/// Expand a workload map into a placement-ordered instance list. Special
/// (non-auto-placeable) mutations are dropped; unknown ids are an error.
/// A godseed entry gets its conditions computed against the rest of the
/// workload.
pub fn expand_workload(
    parser: &mut CatalogParser,
    workload: &BTreeMap<String, u32>,
) -> Result<Vec<InstanceSpec>, CatalogError> {
    let mut specs = Vec::new();
    for (mutation_id, &quantity) in workload {
        let mutation = if mutation_id == GODSEED_ID {
            let available: BTreeSet<String> = workload
                .keys()
                .filter(|id| *id != GODSEED_ID)
                .cloned()
                .collect();
            parser.parse_godseed(&available)?
        } else {
            parser.parse(mutation_id)?
        };
        if mutation.special {
            continue;
        }
        for n in 0..quantity {
            specs.push(InstanceSpec {
                instance_id: format!("{mutation_id}_{n}"),
                mutation: mutation.clone(),
            });
        }
    }

    specs.sort_by(|a, b| {
        priority(&b.mutation)
            .cmp(&priority(&a.mutation))
            .then_with(|| a.instance_id.cmp(&b.instance_id))
    });
    Ok(specs)
}

fn priority(mutation: &ParsedMutation) -> u32 {
    mutation.area() * 100 + mutation.tier as u32 * 10 + if mutation.isolated { 0 } else { 1 }
}

/// Build a layout greedily. Instances with no feasible anchor are skipped.
pub fn build_layout(
    parser: &mut CatalogParser,
    workload: &BTreeMap<String, u32>,
    unlocked: &BTreeSet<Cell>,
    profile: &StrategyProfile,
    rng: &mut Rng,
) -> Result<State, CatalogError> {
    let specs = expand_workload(parser, workload)?;
    let mut state = State::new(unlocked);
    place_instances(&mut state, &specs, profile, parser, rng);
    Ok(state)
}

/// Place a list of instances into an existing state, best anchor first.
pub fn place_instances(
    state: &mut State,
    specs: &[InstanceSpec],
    profile: &StrategyProfile,
    parser: &mut CatalogParser,
    rng: &mut Rng,
) {
    for spec in specs {
        let candidates = feasible_anchors(state, &spec.mutation);
        if candidates.is_empty() {
            continue;
        }
        let ranked = rank_candidates(state, &spec.mutation, candidates, profile, parser);
        let index = pick_candidate(ranked.len(), 3, profile.randomness, rng);
        placer::execute(state, &spec.mutation, &ranked[index].0, &spec.instance_id);
    }
}
