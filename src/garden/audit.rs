//! Layout auditing: verify every structural invariant of a State. The
//! objective runner uses this as its final validation sweep; the test
//! suites use it to check optimizer output wholesale.

use crate::catalog::CatalogParser;

use super::state::State;

/// Fast check that every placement's mutation-dependency requirements still
/// hold. Crop and isolation invariants are maintained structurally by the
/// placer, but removing or relocating a provider can strand its dependents;
/// move operators call this before accepting.
pub fn deps_satisfied(state: &State, parser: &mut CatalogParser) -> bool {
    for (_, placement) in state.placements.iter() {
        let Ok(mutation) = parser.parse(&placement.mutation_id) else {
            return false;
        };
        // Isolated placements are exempt: their ring is empty by
        // construction, so any parsed dep requirement is moot.
        if placement.isolated || mutation.deps.is_empty() {
            continue;
        }
        let ring = placement.footprint.ring();
        for (dep, &required) in &mutation.deps {
            let mut seen = std::collections::BTreeSet::new();
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
            if (seen.len() as u32) < required {
                return false;
            }
        }
    }
    true
}

/// Check all invariants. Returns one message per violation; an empty vec
/// means the state is sound.
pub fn audit_state(state: &State, parser: &mut CatalogParser) -> Vec<String> {
    let mut violations = Vec::new();

    let placements: Vec<_> = state
        .placements
        .iter()
        .map(|(id, p)| (id.clone(), p.clone()))
        .collect();

    // Footprints: unlocked cells only, no overlap, no crop underneath.
    for (i, (id, placement)) in placements.iter().enumerate() {
        for cell in placement.footprint.cells() {
            if !state.board.is_unlocked(cell) {
                violations.push(format!("{id}: footprint cell {cell:?} is locked"));
            }
            if state.crops.has_crop(cell) {
                violations.push(format!("{id}: footprint cell {cell:?} holds a crop"));
            }
        }
        for (other_id, other) in placements.iter().skip(i + 1) {
            if placement.footprint.intersects(&other.footprint) {
                violations.push(format!("{id}: footprint overlaps {other_id}"));
            }
        }
    }

    for (id, placement) in &placements {
        let mutation = match parser.parse(&placement.mutation_id) {
            Ok(m) => m,
            Err(err) => {
                violations.push(format!("{id}: {err}"));
                continue;
            }
        };
        let ring = placement.footprint.ring();

        if placement.isolated {
            for cell in &ring {
                if state.crops.has_crop(*cell) {
                    violations.push(format!("{id}: isolated ring cell {cell:?} has a crop"));
                }
                if state.placements.instance_at(*cell).is_some() {
                    violations.push(format!(
                        "{id}: isolated ring cell {cell:?} touches another footprint"
                    ));
                }
                if state.board.is_unlocked(*cell) && !state.is_reserved(*cell) {
                    violations.push(format!("{id}: isolated ring cell {cell:?} not reserved"));
                }
            }
            continue;
        }

        for (crop, &required) in &mutation.crops {
            let serving_cells = ring
                .iter()
                .filter(|cell| {
                    state.crops.get(**cell).is_some_and(|record| {
                        record.crop == *crop && record.serving.contains(id)
                    })
                })
                .count() as u32;
            if serving_cells < required {
                violations.push(format!(
                    "{id}: crop '{crop}' satisfied {serving_cells}/{required}"
                ));
            }
        }

        for (dep, &required) in &mutation.deps {
            let mut seen = std::collections::BTreeSet::new();
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
            if (seen.len() as u32) < required {
                violations.push(format!(
                    "{id}: dependency '{dep}' satisfied {}/{required}",
                    seen.len()
                ));
            }
        }
    }

    // Crop liveness and placement mirroring.
    for (cell, record) in state.crops.iter() {
        if record.serving.is_empty() {
            violations.push(format!("crop at {cell:?} has no servers"));
        }
        for server in &record.serving {
            if !state.placements.contains(server) {
                violations.push(format!("crop at {cell:?} serves dead instance {server}"));
            }
        }
        if !state.board.is_unlocked(*cell) {
            violations.push(format!("crop at {cell:?} sits on a locked cell"));
        }
        if state.is_reserved(*cell) {
            violations.push(format!("crop at {cell:?} sits on a reserved cell"));
        }
    }

    violations
}
