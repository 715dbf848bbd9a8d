//! Anchor feasibility: a pure check that answers whether a mutation fits at
//! a given anchor and, if so, how its adjacency requirements would be met.
//! Deterministic for identical inputs; ring traversal is row-major.

use std::collections::BTreeMap;

use crate::catalog::ParsedMutation;

use super::geometry::Cell;
use super::state::State;

/// A placement the checker has proven feasible. `satisfied_crops` lists
/// existing ring crops to share (capped at the required count per kind);
/// `free_cells` lists ring cells able to take the `needed_crops` remainder,
/// in ring order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeasiblePlacement {
    pub anchor: Cell,
    pub satisfied_crops: BTreeMap<String, Vec<Cell>>,
    pub satisfied_deps: BTreeMap<String, Vec<String>>,
    pub needed_crops: BTreeMap<String, u32>,
    pub free_cells: Vec<Cell>,
}

impl FeasiblePlacement {
    /// Ring cells already carrying a required crop, summed across kinds.
    pub fn shared_crop_count(&self) -> usize {
        self.satisfied_crops.values().map(Vec::len).sum()
    }

    pub fn needed_crop_count(&self) -> u32 {
        self.needed_crops.values().sum()
    }
}

/// Check a mutation at an anchor against the current state.
pub fn check_placement(
    state: &State,
    mutation: &ParsedMutation,
    anchor: Cell,
) -> Option<FeasiblePlacement> {
    let footprint = mutation.footprint_at(anchor);
    if !state.board.fits_rect(&footprint) {
        return None;
    }
    if footprint.cells().iter().any(|c| state.is_reserved(*c)) {
        return None;
    }

    let ring = footprint.ring();

    if mutation.isolated {
        for cell in &ring {
            if state.crops.has_crop(*cell) {
                return None;
            }
            if state.placements.instance_at(*cell).is_some() {
                return None;
            }
        }
        return Some(FeasiblePlacement {
            anchor,
            satisfied_crops: BTreeMap::new(),
            satisfied_deps: BTreeMap::new(),
            needed_crops: BTreeMap::new(),
            free_cells: Vec::new(),
        });
    }

    let mut satisfied_crops: BTreeMap<String, Vec<Cell>> = BTreeMap::new();
    let mut satisfied_deps: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut free_cells = Vec::new();

    for cell in &ring {
        if let Some(crop) = state.crops.crop_at(*cell) {
            if let Some(&required) = mutation.crops.get(crop) {
                let entry = satisfied_crops.entry(crop.to_string()).or_default();
                if (entry.len() as u32) < required {
                    entry.push(*cell);
                }
            }
            continue;
        }
        if let Some(instance_id) = state.placements.instance_at(*cell) {
            let placement = state
                .placements
                .get(instance_id)
                .expect("reverse index points at a live placement");
            if mutation.deps.contains_key(&placement.mutation_id) {
                let entry = satisfied_deps
                    .entry(placement.mutation_id.clone())
                    .or_default();
                if !entry.iter().any(|id| id == instance_id) {
                    entry.push(instance_id.to_string());
                }
            }
            continue;
        }
        if state.crop_eligible(*cell) {
            free_cells.push(*cell);
        }
    }

    let mut needed_crops = BTreeMap::new();
    for (crop, &required) in &mutation.crops {
        let have = satisfied_crops.get(crop).map_or(0, |v| v.len() as u32);
        if required > have {
            needed_crops.insert(crop.clone(), required - have);
        }
    }

    for (dep, &required) in &mutation.deps {
        let have = satisfied_deps.get(dep).map_or(0, |v| v.len() as u32);
        if have < required {
            return None;
        }
    }

    let total_needed: u32 = needed_crops.values().sum();
    if total_needed as usize > free_cells.len() {
        return None;
    }

    Some(FeasiblePlacement {
        anchor,
        satisfied_crops,
        satisfied_deps,
        needed_crops,
        free_cells,
    })
}

/// All feasible anchors for a mutation, in row-major order.
pub fn feasible_anchors(state: &State, mutation: &ParsedMutation) -> Vec<FeasiblePlacement> {
    let mut out = Vec::new();
    for y in 0..=(super::geometry::GRID_SIZE - mutation.height) {
        for x in 0..=(super::geometry::GRID_SIZE - mutation.width) {
            if let Some(feasible) = check_placement(state, mutation, Cell::new(x, y)) {
                out.push(feasible);
            }
        }
    }
    out
}
