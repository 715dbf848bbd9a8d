//! Placement map: instance-id to placement record, plus the reverse
//! cell-to-instance index used by adjacency scans.

use std::collections::BTreeMap;

use super::geometry::{Cell, Footprint};

/// One placed copy of a mutation. `crops` lists the cells this instance
/// claims a serving on, mirrored from the crop map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub instance_id: String,
    pub mutation_id: String,
    pub footprint: Footprint,
    pub crops: Vec<(Cell, String)>,
    pub isolated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlacementMap {
    by_id: BTreeMap<String, Placement>,
    by_cell: BTreeMap<Cell, String>,
}

impl PlacementMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, placement: Placement) {
        for cell in placement.footprint.cells() {
            self.by_cell.insert(cell, placement.instance_id.clone());
        }
        self.by_id.insert(placement.instance_id.clone(), placement);
    }

    pub fn remove(&mut self, instance_id: &str) -> Option<Placement> {
        let placement = self.by_id.remove(instance_id)?;
        for cell in placement.footprint.cells() {
            self.by_cell.remove(&cell);
        }
        Some(placement)
    }

    pub fn get(&self, instance_id: &str) -> Option<&Placement> {
        self.by_id.get(instance_id)
    }

    pub fn contains(&self, instance_id: &str) -> bool {
        self.by_id.contains_key(instance_id)
    }

    /// Instance occupying this cell with its footprint, if any.
    pub fn instance_at(&self, cell: Cell) -> Option<&str> {
        self.by_cell.get(&cell).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Placement)> {
        self.by_id.iter()
    }

    /// Instance ids in stable (sorted) order, for seeded random picks.
    pub fn ids(&self) -> Vec<String> {
        self.by_id.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(id: &str, x: u8, y: u8, w: u8, h: u8) -> Placement {
        Placement {
            instance_id: id.to_string(),
            mutation_id: "m".to_string(),
            footprint: Footprint::new(Cell::new(x, y), w, h),
            crops: Vec::new(),
            isolated: false,
        }
    }

    #[test]
    fn reverse_index_tracks_every_footprint_cell() {
        let mut map = PlacementMap::new();
        map.insert(placement("m_0", 2, 2, 2, 2));
        assert_eq!(map.instance_at(Cell::new(3, 3)), Some("m_0"));
        assert_eq!(map.instance_at(Cell::new(4, 4)), None);

        let removed = map.remove("m_0").unwrap();
        assert_eq!(removed.footprint.area(), 4);
        assert_eq!(map.instance_at(Cell::new(3, 3)), None);
        assert!(map.is_empty());
    }
}
