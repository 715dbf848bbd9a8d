//! Bulk fast path: when one 1x1 mutation kind dominates the workload,
//! pre-lay its crops in a regular pattern across the whole board, then pack
//! mutations into the gaps, preferring anchors that reuse the field. The
//! best pattern by placement count wins.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{CatalogError, CatalogParser};
use crate::garden::{all_cells, feasible_anchors, placer, Cell, State};

use super::greedy::{expand_workload, place_instances};
use super::rng::Rng;
use super::scoring::StrategyProfile;

/// Share of the total quantity one kind must reach to trigger the fast path.
pub const DOMINANCE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropPattern {
    AlternatingRows,
    SparsePairs,
    DensePairs,
    ThreeRow,
    SpacedGrid,
    DiagonalStripe,
    HorizontalStripe,
    Checkerboard,
}

pub const ALL_PATTERNS: [CropPattern; 8] = [
    CropPattern::AlternatingRows,
    CropPattern::SparsePairs,
    CropPattern::DensePairs,
    CropPattern::ThreeRow,
    CropPattern::SpacedGrid,
    CropPattern::DiagonalStripe,
    CropPattern::HorizontalStripe,
    CropPattern::Checkerboard,
];

impl CropPattern {
    pub fn name(self) -> &'static str {
        match self {
            Self::AlternatingRows => "alternating-rows",
            Self::SparsePairs => "sparse-pairs",
            Self::DensePairs => "dense-pairs",
            Self::ThreeRow => "three-row",
            Self::SpacedGrid => "spaced-grid",
            Self::DiagonalStripe => "diagonal-stripe",
            Self::HorizontalStripe => "horizontal-stripe",
            Self::Checkerboard => "checkerboard",
        }
    }

    fn includes(self, cell: Cell, spacing: u8) -> bool {
        let (x, y) = (cell.x, cell.y);
        match self {
            Self::AlternatingRows => y % 2 == 0,
            Self::SparsePairs => y % 3 == 0 && x % 3 != 2,
            Self::DensePairs => x % 3 != 2,
            Self::ThreeRow => y % 3 != 2,
            Self::SpacedGrid => x % spacing == 0 && y % spacing == 0,
            Self::DiagonalStripe => (x + y) % 3 == 0,
            Self::HorizontalStripe => y % 3 == 0,
            Self::Checkerboard => (x + y) % 2 == 0,
        }
    }
}

/// The dominant kind of a workload, if the fast path applies: at least
/// [DOMINANCE_THRESHOLD] of the total quantity, 1x1, non-isolated, and
/// auto-placeable.
pub fn dominant_mutation(
    parser: &mut CatalogParser,
    workload: &BTreeMap<String, u32>,
) -> Result<Option<(String, u32)>, CatalogError> {
    let total: u32 = workload.values().sum();
    if total == 0 {
        return Ok(None);
    }
    for (id, &quantity) in workload {
        if (quantity as f64) < total as f64 * DOMINANCE_THRESHOLD {
            continue;
        }
        let mutation = parser.parse(id)?;
        if mutation.width == 1 && mutation.height == 1 && !mutation.isolated && !mutation.special
        {
            return Ok(Some((id.clone(), quantity)));
        }
    }
    Ok(None)
}

/// Run the bulk fast path. Returns None when no dominant kind exists.
pub fn build_bulk_layout(
    parser: &mut CatalogParser,
    workload: &BTreeMap<String, u32>,
    unlocked: &BTreeSet<Cell>,
    profile: &StrategyProfile,
    rng: &mut Rng,
) -> Result<Option<State>, CatalogError> {
    let Some((dominant_id, quantity)) = dominant_mutation(parser, workload)? else {
        return Ok(None);
    };
    let mutation = parser.parse(&dominant_id)?;

    // Kinds cycled across the pattern field, one slot per required crop.
    let mut kinds = Vec::new();
    for (crop, &count) in &mutation.crops {
        for _ in 0..count {
            kinds.push(crop.clone());
        }
    }

    let total_crops_needed = quantity * mutation.total_crops_required();
    let spacing = (f64::from(total_crops_needed + 1).sqrt().ceil() as u8).max(1);

    let mut best: Option<(State, usize)> = None;
    for pattern in ALL_PATTERNS {
        let mut state = State::new(unlocked);

        if !kinds.is_empty() {
            let mut slot = 0usize;
            for cell in all_cells() {
                if state.board.is_free(cell) && pattern.includes(cell, spacing) {
                    state.board.occupy_cell(cell);
                    state.crops.plant_unclaimed(cell, &kinds[slot % kinds.len()]);
                    slot += 1;
                }
            }
        }

        let placed = pack_dominant(&mut state, parser, &dominant_id, quantity)?;
        state.sweep_unclaimed_crops();

        let better = best.as_ref().map_or(true, |(_, count)| placed > *count);
        if better {
            best = Some((state, placed));
        }
        if placed as u32 == quantity {
            break;
        }
    }

    let (mut state, _) = best.expect("at least one pattern ran");

    // Append whatever the workload asked for beyond the dominant kind.
    let rest: BTreeMap<String, u32> = workload
        .iter()
        .filter(|(id, _)| **id != dominant_id)
        .map(|(id, qty)| (id.clone(), *qty))
        .collect();
    if !rest.is_empty() {
        let specs = expand_workload(parser, &rest)?;
        place_instances(&mut state, &specs, profile, parser, rng);
    }

    Ok(Some(state))
}

/// Pack as many dominant instances as fit, preferring anchors that reuse
/// the pre-laid field, then costing fewer fresh crops, then board order.
fn pack_dominant(
    state: &mut State,
    parser: &mut CatalogParser,
    dominant_id: &str,
    quantity: u32,
) -> Result<usize, CatalogError> {
    let mutation = parser.parse(dominant_id)?;
    let mut placed = 0usize;
    while (placed as u32) < quantity {
        let candidates = feasible_anchors(state, &mutation);
        let Some(best) = candidates.into_iter().max_by(|a, b| {
            a.shared_crop_count()
                .cmp(&b.shared_crop_count())
                .then_with(|| b.needed_crop_count().cmp(&a.needed_crop_count()))
                .then_with(|| (b.anchor.y, b.anchor.x).cmp(&(a.anchor.y, a.anchor.x)))
        }) else {
            break;
        };
        placer::execute(state, &mutation, &best, &format!("{dominant_id}_{placed}"));
        placed += 1;
    }
    Ok(placed)
}
