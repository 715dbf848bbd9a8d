//! Output projection: turn a final State into the annotated grid and
//! placed-mutation list hosts consume, plus an ASCII rendering for the CLI.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::catalog::Catalog;
use crate::garden::{Cell, State, GRID_SIZE};

/// One annotated grid cell. Cells outside any placement, crop, or halo are
/// `None` in the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GridCell {
    MutationArea {
        id: String,
        is_center: bool,
        is_isolated: bool,
    },
    Crop {
        crop: String,
        primary_server: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        all_servers: Option<Vec<String>>,
    },
    EmptyZone {
        source_id: String,
    },
}

/// A placed instance in host-facing form, with the raw catalog conditions
/// echoed back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedMutation {
    pub id: String,
    pub mutation_id: String,
    pub name: String,
    pub anchor: Cell,
    pub size: String,
    pub conditions: Map<String, Value>,
    pub is_isolated: bool,
    /// "x,y" keys of this instance's crops that other instances share.
    pub shared_crop_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutOutput {
    pub grid: Vec<Vec<Option<GridCell>>>,
    pub placements: Vec<PlacedMutation>,
    pub unlocked: BTreeSet<Cell>,
}

fn crop_key(cell: Cell) -> String {
    format!("{},{}", cell.x, cell.y)
}

/// Project a state into the external output format. The catalog supplies
/// display names and echoed conditions; synthesized entries (godseed) echo
/// an empty condition map.
pub fn build_output(state: &State, catalog: &Catalog) -> LayoutOutput {
    let size = GRID_SIZE as usize;
    let mut grid: Vec<Vec<Option<GridCell>>> = vec![vec![None; size]; size];

    for (instance_id, placement) in state.placements.iter() {
        let center = placement.footprint.center();
        for cell in placement.footprint.cells() {
            grid[cell.y as usize][cell.x as usize] = Some(GridCell::MutationArea {
                id: instance_id.clone(),
                is_center: cell == center,
                is_isolated: placement.isolated,
            });
        }
    }

    for (cell, record) in state.crops.iter() {
        let servers: Vec<String> = record.serving.iter().cloned().collect();
        let primary = servers.first().cloned().unwrap_or_default();
        grid[cell.y as usize][cell.x as usize] = Some(GridCell::Crop {
            crop: record.crop.clone(),
            primary_server: primary,
            all_servers: (servers.len() >= 2).then_some(servers),
        });
    }

    for (cell, source_id) in &state.reserved {
        if grid[cell.y as usize][cell.x as usize].is_none() {
            grid[cell.y as usize][cell.x as usize] = Some(GridCell::EmptyZone {
                source_id: source_id.clone(),
            });
        }
    }

    let mut placements = Vec::new();
    for (instance_id, placement) in state.placements.iter() {
        let record = catalog.get(&placement.mutation_id);
        let shared_crop_keys = placement
            .crops
            .iter()
            .filter(|(cell, _)| {
                state
                    .crops
                    .get(*cell)
                    .is_some_and(|r| r.serving.len() >= 2)
            })
            .map(|(cell, _)| crop_key(*cell))
            .collect();
        placements.push(PlacedMutation {
            id: instance_id.clone(),
            mutation_id: placement.mutation_id.clone(),
            name: record
                .map(|r| r.name.clone())
                .unwrap_or_else(|| placement.mutation_id.clone()),
            anchor: placement.footprint.anchor,
            size: format!(
                "{}x{}",
                placement.footprint.width, placement.footprint.height
            ),
            conditions: record.map(|r| r.conditions.clone()).unwrap_or_default(),
            is_isolated: placement.isolated,
            shared_crop_keys,
        });
    }

    LayoutOutput {
        grid,
        placements,
        unlocked: state.board.unlocked_set(),
    }
}

/// Render the grid for terminals: `M` mutation center, `m` footprint, `C`
/// shared crop, `c` crop, `x` reserved halo, `.` free, `#` locked.
pub fn render_ascii(output: &LayoutOutput) -> String {
    let mut text = String::with_capacity(11 * 11);
    for (y, row) in output.grid.iter().enumerate() {
        for (x, cell) in row.iter().enumerate() {
            let glyph = match cell {
                Some(GridCell::MutationArea { is_center, .. }) => {
                    if *is_center {
                        'M'
                    } else {
                        'm'
                    }
                }
                Some(GridCell::Crop { all_servers, .. }) => {
                    if all_servers.is_some() {
                        'C'
                    } else {
                        'c'
                    }
                }
                Some(GridCell::EmptyZone { .. }) => 'x',
                None => {
                    if output.unlocked.contains(&Cell::new(x as u8, y as u8)) {
                        '.'
                    } else {
                        '#'
                    }
                }
            };
            text.push(glyph);
        }
        text.push('\n');
    }
    text
}

/// An all-null grid for the empty workload: no placements, unlocked echoed.
pub fn empty_output(unlocked: &BTreeSet<Cell>) -> LayoutOutput {
    let size = GRID_SIZE as usize;
    LayoutOutput {
        grid: vec![vec![None; size]; size],
        placements: Vec::new(),
        unlocked: unlocked.clone(),
    }
}
