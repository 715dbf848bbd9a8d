//! Compact layout persistence: the annotated grid flattened to
//! `(row, col, type, id)` tuples and base64-encoded for host storage (URL
//! fragments, save slots). Only mutation-area and crop cells are persisted;
//! halos and empties are derivable.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::grid::{GridCell, LayoutOutput};

/// One persisted cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCell {
    pub row: u8,
    pub col: u8,
    pub kind: EncodedKind,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedKind {
    Mutation,
    Crop,
}

impl EncodedKind {
    fn tag(self) -> char {
        match self {
            Self::Mutation => 'm',
            Self::Crop => 'c',
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "m" => Some(Self::Mutation),
            "c" => Some(Self::Crop),
            _ => None,
        }
    }
}

/// Encode a layout to its compact base64 form.
pub fn encode_layout(output: &LayoutOutput) -> String {
    let mut entries = Vec::new();
    for (row, cells) in output.grid.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            let (kind, id) = match cell {
                Some(GridCell::MutationArea { id, .. }) => (EncodedKind::Mutation, id.as_str()),
                Some(GridCell::Crop { crop, .. }) => (EncodedKind::Crop, crop.as_str()),
                _ => continue,
            };
            entries.push(format!("{row},{col},{},{id}", kind.tag()));
        }
    }
    STANDARD.encode(entries.join(";"))
}

/// Decode a compact layout string. Returns None on malformed input.
pub fn decode_layout(encoded: &str) -> Option<Vec<EncodedCell>> {
    let bytes = STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    if text.is_empty() {
        return Some(Vec::new());
    }

    let mut cells = Vec::new();
    for entry in text.split(';') {
        let mut parts = entry.splitn(4, ',');
        let row: u8 = parts.next()?.parse().ok()?;
        let col: u8 = parts.next()?.parse().ok()?;
        let kind = EncodedKind::from_tag(parts.next()?)?;
        let id = parts.next()?.to_string();
        if row >= crate::garden::GRID_SIZE || col >= crate::garden::GRID_SIZE || id.is_empty() {
            return None;
        }
        cells.push(EncodedCell {
            row,
            col,
            kind,
            id,
        });
    }
    Some(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogParser};
    use crate::garden::{check_placement, placer, Cell, State};
    use crate::output::grid::build_output;
    use serde_json::json;

    fn sample_output() -> LayoutOutput {
        let catalog: Catalog = serde_json::from_value(json!({
            "berry": { "name": "Berry", "size": "1x1",
                       "conditions": { "wheat": 1 } }
        }))
        .unwrap();
        let mut parser = CatalogParser::new(catalog.clone());
        let mut state = State::with_full_board();
        let berry = parser.parse("berry").unwrap();
        let f = check_placement(&state, &berry, Cell::new(5, 5)).unwrap();
        placer::execute(&mut state, &berry, &f, "berry_0");
        build_output(&state, &catalog)
    }

    #[test]
    fn encode_decode_round_trips() {
        let output = sample_output();
        let encoded = encode_layout(&output);
        let cells = decode_layout(&encoded).unwrap();

        // One footprint cell plus one planted wheat.
        assert_eq!(cells.len(), 2);
        assert!(cells.iter().any(|c| {
            c.kind == EncodedKind::Mutation && (c.row, c.col) == (5, 5) && c.id == "berry_0"
        }));
        assert!(cells
            .iter()
            .any(|c| c.kind == EncodedKind::Crop && c.id == "wheat"));
    }

    #[test]
    fn empty_layout_encodes_to_an_empty_list() {
        let output = crate::output::grid::empty_output(&crate::garden::full_unlocked());
        let encoded = encode_layout(&output);
        assert_eq!(decode_layout(&encoded), Some(Vec::new()));
    }

    #[test]
    fn garbage_input_is_rejected() {
        assert_eq!(decode_layout("%%%not-base64%%%"), None);
        let bad_coord = STANDARD.encode("12,99,m,thing");
        assert_eq!(decode_layout(&bad_coord), None);
        let bad_kind = STANDARD.encode("1,1,z,thing");
        assert_eq!(decode_layout(&bad_kind), None);
    }
}
