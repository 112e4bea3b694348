//! The gradebook as the planner sees it, plus the overlay the executor folds its
//! own writes into.

use crate::cell::Column;
use crate::config::GradebookConfig;
use crate::error::{RunError, SnapshotError};
use crate::remote::TabularStore;
use log::debug;
use std::collections::BTreeMap;

/// One student (or group) record. `index` is the sheet row number.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GradebookRow {
    pub index: u32,
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub link: String,
}

impl GradebookRow {
    pub fn new(index: u32, id: &str, first_name: &str, last_name: &str, link: &str) -> Self {
        GradebookRow {
            index,
            id: id.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            link: link.to_string(),
        }
    }

    /// "First Last", trimmed; empty when the row carries no names.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// Read-only view of the gradebook taken once before planning.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GradebookSnapshot {
    rows: Vec<GradebookRow>,
}

impl GradebookSnapshot {
    /// Rows must arrive with strictly increasing indices.
    pub fn new(rows: Vec<GradebookRow>) -> Result<Self, SnapshotError> {
        for pair in rows.windows(2) {
            if pair[1].index <= pair[0].index {
                return Err(SnapshotError {
                    previous: pair[0].index,
                    current: pair[1].index,
                });
            }
        }
        Ok(GradebookSnapshot { rows })
    }

    /// Build from a grid read with [`GradebookConfig::snapshot_range`]. Grid row `i`
    /// is sheet row `start_row + i`; short rows are padded with empty cells.
    pub fn from_grid(grid: &[Vec<String>], config: &GradebookConfig) -> Self {
        let origin = config.snapshot_range().start_col;
        let cell = |row: &[String], col: Column| -> String {
            row.get(col.offset() - origin.offset())
                .cloned()
                .unwrap_or_default()
        };
        let rows = grid
            .iter()
            .enumerate()
            .map(|(i, row)| GradebookRow {
                index: config.start_row + i as u32,
                id: cell(row, config.id_column),
                first_name: config
                    .first_name_column
                    .map(|c| cell(row, c))
                    .unwrap_or_default(),
                last_name: config
                    .last_name_column
                    .map(|c| cell(row, c))
                    .unwrap_or_default(),
                link: cell(row, config.link_column),
            })
            .collect();
        GradebookSnapshot { rows }
    }

    pub fn rows(&self) -> &[GradebookRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: u32) -> Option<&GradebookRow> {
        self.rows
            .binary_search_by_key(&index, |r| r.index)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Earliest row whose id cell equals `id` after trimming both sides.
    pub fn find_by_id(&self, id: &str) -> Option<&GradebookRow> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        self.rows.iter().find(|r| r.id.trim() == id)
    }
}

/// Read the configured columns from the tabular store into a snapshot.
pub fn load_snapshot(
    store: &dyn TabularStore,
    config: &GradebookConfig,
) -> Result<GradebookSnapshot, RunError> {
    let range = config.snapshot_range();
    let grid = store.read_range(&config.sheet_id, &config.sheet_name, &range)?;
    let snapshot = GradebookSnapshot::from_grid(&grid, config);
    debug!(
        "Loaded {} gradebook rows from {}",
        snapshot.len(),
        range.qualified(&config.sheet_name)
    );
    Ok(snapshot)
}

/// Anything that can answer "what is in the link cell of row n".
pub trait LinkCells {
    fn link_cell(&self, row: u32) -> Option<&str>;
}

impl LinkCells for GradebookSnapshot {
    fn link_cell(&self, row: u32) -> Option<&str> {
        self.row(row).map(|r| r.link.as_str())
    }
}

/// The snapshot plus everything the executor wrote during this run.
///
/// Reads go through the overlay first, so a link written (or a row appended) for
/// one file is visible when the next file is checked.
#[derive(Debug)]
pub struct LiveGradebook<'a> {
    snapshot: &'a GradebookSnapshot,
    written: BTreeMap<u32, String>,
    created: BTreeMap<String, u32>,
}

impl<'a> LiveGradebook<'a> {
    pub fn new(snapshot: &'a GradebookSnapshot) -> Self {
        LiveGradebook {
            snapshot,
            written: BTreeMap::new(),
            created: BTreeMap::new(),
        }
    }

    /// Row appended earlier in this run for `identity`.
    pub fn created_row(&self, identity: &str) -> Option<u32> {
        self.created.get(identity).copied()
    }

    pub fn record_link(&mut self, row: u32, value: String) {
        self.written.insert(row, value);
    }

    pub fn record_new_row(&mut self, identity: &str, row: u32, link: String) {
        self.created.insert(identity.to_string(), row);
        self.written.insert(row, link);
    }

    pub fn created_rows(&self) -> usize {
        self.created.len()
    }
}

impl LinkCells for LiveGradebook<'_> {
    fn link_cell(&self, row: u32) -> Option<&str> {
        self.written
            .get(&row)
            .map(String::as_str)
            .or_else(|| self.snapshot.link_cell(row))
    }
}
