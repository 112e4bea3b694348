//! Local stand-ins for the remote stores: a CSV file as the gradebook and a
//! directory as the file store. Useful for offline runs and for rehearsing a
//! batch before pointing it at the real sheet.

use crate::cell::{CellRef, RangeSpec};
use crate::config::Visibility;
use crate::error::{StoreError, TabularError};
use crate::remote::{FileStore, StoreRequest, StoredFile, TabularStore};
use crate::tables::{parse_csv_row, split_records, write_csv};
use log::{debug, trace};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A CSV file treated as a single sheet: record n of the file is sheet row n.
/// A quoted cell may span several lines and still counts as one row.
///
/// Every write rewrites the whole file, so the file on disk always reflects the
/// writes made so far.
#[derive(Debug, Clone)]
pub struct CsvSheetStore {
    path: PathBuf,
    rows: Vec<Vec<String>>,
}

impl CsvSheetStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TabularError> {
        let path = path.into();
        let text = fs::read_to_string(&path)
            .map_err(|e| TabularError::Read(format!("{}: {}", path.display(), e)))?;
        let rows = split_records(&text)
            .iter()
            .map(|record| {
                if record.trim().is_empty() {
                    Vec::new()
                } else {
                    parse_csv_row(record)
                }
            })
            .collect();
        Ok(CsvSheetStore { path, rows })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn cell_mut(&mut self, row: u32, col: usize) -> &mut String {
        let r = row as usize - 1;
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let cells = &mut self.rows[r];
        if cells.len() <= col {
            cells.resize_with(col + 1, String::new);
        }
        &mut cells[col]
    }

    fn last_used_row(&self) -> u32 {
        self.rows
            .iter()
            .rposition(|cells| cells.iter().any(|c| !c.trim().is_empty()))
            .map(|i| i as u32 + 1)
            .unwrap_or(0)
    }

    fn save(&self) -> Result<(), TabularError> {
        fs::write(&self.path, write_csv(&self.rows))
            .map_err(|e| TabularError::Write(format!("{}: {}", self.path.display(), e)))
    }
}

impl TabularStore for CsvSheetStore {
    fn read_range(
        &self,
        _sheet_id: &str,
        sheet_name: &str,
        range: &RangeSpec,
    ) -> Result<Vec<Vec<String>>, TabularError> {
        trace!("Reading {} from {}", range.qualified(sheet_name), self.path.display());
        let first = range.start_col.offset();
        let last = range.end_col.offset();
        let mut grid: Vec<Vec<String>> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(i, _)| range.contains_row(*i as u32 + 1))
            .map(|(_, cells)| {
                cells
                    .iter()
                    .skip(first)
                    .take(last - first + 1)
                    .cloned()
                    .collect()
            })
            .collect();
        while grid
            .last()
            .is_some_and(|cells| cells.iter().all(|c| c.trim().is_empty()))
        {
            grid.pop();
        }
        Ok(grid)
    }

    fn write_cell(
        &mut self,
        _sheet_id: &str,
        _sheet_name: &str,
        cell: CellRef,
        value: &str,
    ) -> Result<(), TabularError> {
        *self.cell_mut(cell.row, cell.col.offset()) = value.to_string();
        self.save()?;
        debug!("Wrote {} in {}", cell, self.path.display());
        Ok(())
    }

    fn append_row(
        &mut self,
        _sheet_id: &str,
        _sheet_name: &str,
        values: &[String],
    ) -> Result<u32, TabularError> {
        let row = self.last_used_row() + 1;
        for (col, value) in values.iter().enumerate() {
            *self.cell_mut(row, col) = value.clone();
        }
        if values.is_empty() {
            self.cell_mut(row, 0);
        }
        self.save()?;
        debug!("Appended row {} to {}", row, self.path.display());
        Ok(row)
    }
}

/// Copies submissions into `<root>/<folder id>/` and links to the copy.
#[derive(Debug, Clone)]
pub struct LocalFolderStore {
    root: PathBuf,
}

impl LocalFolderStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalFolderStore { root: root.into() }
    }
}

impl FileStore for LocalFolderStore {
    fn store(&self, request: &StoreRequest<'_>) -> Result<StoredFile, StoreError> {
        let folder = if request.folder_id.is_empty() {
            self.root.clone()
        } else {
            self.root.join(request.folder_id)
        };
        fs::create_dir_all(&folder)
            .map_err(|e| StoreError::new(format!("cannot create {}: {}", folder.display(), e)))?;

        let content_id = Uuid::new_v4().to_string();
        let safe_name: String = request
            .filename
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        let target = folder.join(format!("{}_{}", content_id, safe_name));
        fs::write(&target, request.bytes)
            .map_err(|e| StoreError::new(format!("cannot write {}: {}", target.display(), e)))?;

        if request.visibility == Visibility::AnyoneWithLink {
            trace!("Local store ignores sharing for {}", target.display());
        }
        let absolute = fs::canonicalize(&target).unwrap_or(target);
        Ok(StoredFile {
            content_id,
            share_url: format!("file://{}", absolute.display()),
        })
    }
}
