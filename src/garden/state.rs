//! Whole-layout state: board occupancy, crops, placements, and the
//! reserved-empty halo cells around isolated mutations. Cloning a State is
//! how the optimizers snapshot candidates.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use super::board::Board;
use super::crops::CropMap;
use super::geometry::Cell;
use super::placements::PlacementMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub board: Board,
    pub crops: CropMap,
    pub placements: PlacementMap,
    /// Reserved-empty cells, keyed to the instance that created the halo.
    /// Reservations outlive their creator: removal never releases them.
    pub reserved: BTreeMap<Cell, String>,
}

impl State {
    pub fn new(unlocked: &BTreeSet<Cell>) -> Self {
        Self {
            board: Board::new(unlocked),
            crops: CropMap::new(),
            placements: PlacementMap::new(),
            reserved: BTreeMap::new(),
        }
    }

    pub fn with_full_board() -> Self {
        Self {
            board: Board::fully_unlocked(),
            crops: CropMap::new(),
            placements: PlacementMap::new(),
            reserved: BTreeMap::new(),
        }
    }

    pub fn is_reserved(&self, cell: Cell) -> bool {
        self.reserved.contains_key(&cell)
    }

    /// Mark a halo cell. The first creator wins; reservations are never
    /// overwritten or released.
    pub fn reserve(&mut self, cell: Cell, source_id: &str) {
        self.reserved
            .entry(cell)
            .or_insert_with(|| source_id.to_string());
    }

    /// Whether a new crop may be planted here: unlocked, unoccupied,
    /// unreserved, and not already growing one.
    pub fn crop_eligible(&self, cell: Cell) -> bool {
        self.board.is_free(cell) && !self.is_reserved(cell) && !self.crops.has_crop(cell)
    }

    pub fn placement_count(&self) -> usize {
        self.placements.len()
    }

    /// Crop cells dropped because no instance ever claimed them. Returns the
    /// number removed. Bulk patterns rely on this after packing.
    pub fn sweep_unclaimed_crops(&mut self) -> usize {
        let orphans = self.crops.unclaimed_cells();
        for cell in &orphans {
            self.crops.delete(*cell);
            self.board.release_cell(*cell);
        }
        orphans.len()
    }
}
