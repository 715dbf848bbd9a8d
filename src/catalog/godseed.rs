//! Godseed condition synthesis: a greedy set cover over the six benefit
//! families. The result is the smallest-found set of extra mutations that,
//! together with what the player already has, covers every benefit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::effects::{Benefit, ALL_BENEFITS};
use super::parser::ParsedMutation;

fn benefits_of(mutation: &ParsedMutation) -> BTreeSet<Benefit> {
    mutation.effects.iter().filter_map(|e| e.benefit()).collect()
}

/// Compute the godseed's dependency conditions. `pool` is the parsed catalog;
/// `available` the mutation ids the player already has placed or stocked.
pub fn cover_conditions(
    pool: &[Arc<ParsedMutation>],
    available: &BTreeSet<String>,
) -> BTreeMap<String, u32> {
    let mut uncovered: BTreeSet<Benefit> = ALL_BENEFITS.into_iter().collect();
    for mutation in pool {
        if available.contains(&mutation.id) {
            for benefit in benefits_of(mutation) {
                uncovered.remove(&benefit);
            }
        }
    }

    // Candidate order: smallest footprint first, then most effects, then id.
    let mut candidates: Vec<&Arc<ParsedMutation>> = pool
        .iter()
        .filter(|m| {
            m.has_only_positive_effects()
                && !m.special
                && !m.isolated
                && !available.contains(&m.id)
        })
        .collect();
    candidates.sort_by(|a, b| {
        a.area()
            .cmp(&b.area())
            .then(b.effects.len().cmp(&a.effects.len()))
            .then(a.id.cmp(&b.id))
    });

    let mut chosen = BTreeMap::new();
    while !uncovered.is_empty() {
        let mut best: Option<(&Arc<ParsedMutation>, usize)> = None;
        for candidate in &candidates {
            if chosen.contains_key(&candidate.id) {
                continue;
            }
            let gain = benefits_of(candidate)
                .iter()
                .filter(|b| uncovered.contains(b))
                .count();
            if gain > 0 && best.map_or(true, |(_, g)| gain > g) {
                best = Some((candidate, gain));
            }
        }
        let Some((pick, _)) = best else {
            break; // nothing left helps; cover what we could
        };
        for benefit in benefits_of(pick) {
            uncovered.remove(&benefit);
        }
        chosen.insert(pick.id.clone(), 1);
    }
    chosen
}
