//! Sparse crop map: which cell grows which crop, and which mutation
//! instances each crop serves. A crop with two or more servers is shared.

use std::collections::{BTreeMap, BTreeSet};

use super::geometry::Cell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropRecord {
    pub crop: String,
    pub serving: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CropMap {
    cells: BTreeMap<Cell, CropRecord>,
}

impl CropMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cell: Cell) -> Option<&CropRecord> {
        self.cells.get(&cell)
    }

    pub fn crop_at(&self, cell: Cell) -> Option<&str> {
        self.cells.get(&cell).map(|r| r.crop.as_str())
    }

    pub fn has_crop(&self, cell: Cell) -> bool {
        self.cells.contains_key(&cell)
    }

    /// Plant a new crop. Panics in debug builds if the cell already has one;
    /// callers must use [CropMap::add_server] to share an existing crop.
    pub fn plant(&mut self, cell: Cell, crop: &str, instance_id: &str) {
        debug_assert!(!self.cells.contains_key(&cell), "replanting {cell:?}");
        let mut serving = BTreeSet::new();
        serving.insert(instance_id.to_string());
        self.cells.insert(
            cell,
            CropRecord {
                crop: crop.to_string(),
                serving,
            },
        );
    }

    /// Add an instance to an existing crop's serving set.
    pub fn add_server(&mut self, cell: Cell, instance_id: &str) {
        if let Some(record) = self.cells.get_mut(&cell) {
            record.serving.insert(instance_id.to_string());
        }
    }

    /// Drop an instance from a crop's serving set. Returns true when the
    /// serving set collapsed to empty and the crop was deleted.
    pub fn remove_server(&mut self, cell: Cell, instance_id: &str) -> bool {
        let emptied = match self.cells.get_mut(&cell) {
            Some(record) => {
                record.serving.remove(instance_id);
                record.serving.is_empty()
            }
            None => return false,
        };
        if emptied {
            self.cells.remove(&cell);
        }
        emptied
    }

    /// Delete a crop outright regardless of servers. Used when sweeping
    /// speculative pattern crops that no mutation ever claimed.
    pub fn delete(&mut self, cell: Cell) -> Option<CropRecord> {
        self.cells.remove(&cell)
    }

    /// Plant a crop with no servers yet. Bulk patterns seed fields this way
    /// and sweep unclaimed cells afterwards.
    pub fn plant_unclaimed(&mut self, cell: Cell, crop: &str) {
        debug_assert!(!self.cells.contains_key(&cell), "replanting {cell:?}");
        self.cells.insert(
            cell,
            CropRecord {
                crop: crop.to_string(),
                serving: BTreeSet::new(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn shared_count(&self) -> usize {
        self.cells.values().filter(|r| r.serving.len() >= 2).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Cell, &CropRecord)> {
        self.cells.iter()
    }

    /// Cells whose serving set is empty, in board order.
    pub fn unclaimed_cells(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .filter(|(_, r)| r.serving.is_empty())
            .map(|(c, _)| *c)
            .collect()
    }
}
