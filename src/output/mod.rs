//! Host-facing output: the annotated grid projection and its compact
//! persisted encoding.

pub mod encode;
pub mod grid;

pub use encode::{decode_layout, encode_layout, EncodedCell, EncodedKind};
pub use grid::{build_output, empty_output, render_ascii, GridCell, LayoutOutput, PlacedMutation};
