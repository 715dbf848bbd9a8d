//! Atomic placement execution and removal. `execute` and `remove` are the
//! only writers of placement state; pairing them preserves every invariant
//! except reserved-empty halos, which persist on purpose.

use crate::catalog::ParsedMutation;

use super::feasibility::FeasiblePlacement;
use super::placements::Placement;
use super::state::State;

/// Apply a feasible placement. Shares the listed existing crops, plants the
/// needed remainder from `free_cells` in order, and records the placement.
/// Isolated mutations reserve their unlocked ring cells instead.
pub fn execute(
    state: &mut State,
    mutation: &ParsedMutation,
    feasible: &FeasiblePlacement,
    instance_id: &str,
) {
    let footprint = mutation.footprint_at(feasible.anchor);
    state.board.occupy_rect(&footprint);

    let mut claimed = Vec::new();

    if mutation.isolated {
        for cell in footprint.ring() {
            if state.board.is_unlocked(cell) {
                state.reserve(cell, instance_id);
            }
        }
    } else {
        for (crop, cells) in &feasible.satisfied_crops {
            let required = mutation.crops.get(crop).copied().unwrap_or(0) as usize;
            for cell in cells.iter().take(required) {
                state.crops.add_server(*cell, instance_id);
                claimed.push((*cell, crop.clone()));
            }
        }

        let mut free = feasible.free_cells.iter();
        for (crop, &needed) in &feasible.needed_crops {
            for _ in 0..needed {
                let cell = *free
                    .next()
                    .expect("feasibility guaranteed enough free cells");
                state.board.occupy_cell(cell);
                state.crops.plant(cell, crop, instance_id);
                claimed.push((cell, crop.clone()));
            }
        }
    }

    state.placements.insert(Placement {
        instance_id: instance_id.to_string(),
        mutation_id: mutation.id.clone(),
        footprint,
        crops: claimed,
        isolated: mutation.isolated,
    });
}

/// Remove a placement. Crops whose serving set collapses are deleted and
/// their cells released. Reserved-empty cells stay reserved.
pub fn remove(state: &mut State, instance_id: &str) -> Option<Placement> {
    let placement = state.placements.remove(instance_id)?;
    state.board.release_rect(&placement.footprint);
    for (cell, _) in &placement.crops {
        if state.crops.remove_server(*cell, instance_id) {
            state.board.release_cell(*cell);
        }
    }
    Some(placement)
}

/// Re-apply a previously removed placement verbatim, restoring its exact
/// crop configuration. Used for move rollback; the caller guarantees the
/// footprint and crop cells are available again.
pub fn restore(state: &mut State, placement: &Placement) {
    state.board.occupy_rect(&placement.footprint);
    if placement.isolated {
        for cell in placement.footprint.ring() {
            if state.board.is_unlocked(cell) {
                state.reserve(cell, &placement.instance_id);
            }
        }
    }
    for (cell, crop) in &placement.crops {
        if state.crops.has_crop(*cell) {
            state.crops.add_server(*cell, &placement.instance_id);
        } else {
            state.board.occupy_cell(*cell);
            state.crops.plant(*cell, crop, &placement.instance_id);
        }
    }
    state.placements.insert(placement.clone());
}
