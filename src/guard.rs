use crate::gradebook::LinkCells;
use serde::{Deserialize, Serialize};

/// Whether a link may be written to a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Clear,
    Conflict,
}

/// A row is in conflict when its link cell holds anything but whitespace.
///
/// Only the target cell is inspected, never the identity. Rows the view does not
/// know about are clear.
pub fn check(cells: &impl LinkCells, row: u32) -> Verdict {
    match cells.link_cell(row) {
        Some(value) if !value.trim().is_empty() => Verdict::Conflict,
        _ => Verdict::Clear,
    }
}
