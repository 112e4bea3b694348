// Shared fixtures and in-memory stores for the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use submission_linker::cell::{CellRef, Column, RangeSpec};
use submission_linker::config::{GradebookConfig, LinkStyle, UploadConfig, Visibility};
use submission_linker::error::{AuthError, StoreError, TabularError};
use submission_linker::gradebook::{GradebookRow, GradebookSnapshot};
use submission_linker::remote::{
    Credential, CredentialProvider, FileStore, StoreRequest, StoredFile, TabularStore,
};
use submission_linker::submissions::SubmissionFile;

pub fn col(letters: &str) -> Column {
    Column::from_letters(letters).unwrap()
}

/// Names in B and C, id in D, link in M, data from row 2.
pub fn gradebook_config() -> GradebookConfig {
    GradebookConfig {
        sheet_id: "sheet123".to_string(),
        sheet_name: "A1".to_string(),
        id_column: col("D"),
        first_name_column: Some(col("B")),
        last_name_column: Some(col("C")),
        link_column: col("M"),
        start_row: 2,
    }
}

pub fn upload_config() -> UploadConfig {
    UploadConfig {
        folder_id: "folder123".to_string(),
        visibility: Visibility::AnyoneWithLink,
        link_style: LinkStyle::Url,
    }
}

pub fn row(index: u32, id: &str, first: &str, last: &str, link: &str) -> GradebookRow {
    GradebookRow::new(index, id, first, last, link)
}

pub fn snapshot(rows: Vec<GradebookRow>) -> GradebookSnapshot {
    GradebookSnapshot::new(rows).unwrap()
}

/// A file that only exists by name; the executor tests write real ones.
pub fn file(name: &str) -> SubmissionFile {
    SubmissionFile::new(format!("/submissions/{}", name), name, 0)
}

/// Write `names` into `dir`, each holding its own name as content.
pub fn write_files(dir: &Path, names: &[&str]) -> Vec<SubmissionFile> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            fs::write(&path, name.as_bytes()).unwrap();
            SubmissionFile::new(path, *name, name.len() as u64)
        })
        .collect()
}

/// A sheet held in memory, addressed by (row, 0-based column).
#[derive(Default)]
pub struct MemorySheet {
    pub cells: BTreeMap<(u32, usize), String>,
    pub writes: Vec<(CellRef, String)>,
    pub appended: Vec<(u32, Vec<String>)>,
    pub fail_writes_to_row: Option<u32>,
    pub fail_appends: bool,
}

impl MemorySheet {
    pub fn set(&mut self, row: u32, column: &str, value: &str) {
        self.cells.insert((row, col(column).offset()), value.to_string());
    }

    pub fn get(&self, row: u32, column: &str) -> Option<&str> {
        self.cells
            .get(&(row, col(column).offset()))
            .map(String::as_str)
    }

    fn last_row(&self) -> u32 {
        self.cells.keys().map(|(row, _)| *row).max().unwrap_or(0)
    }
}

impl TabularStore for MemorySheet {
    fn read_range(
        &self,
        _sheet_id: &str,
        _sheet_name: &str,
        range: &RangeSpec,
    ) -> Result<Vec<Vec<String>>, TabularError> {
        let last = self.last_row();
        let mut grid = Vec::new();
        for row in range.start_row..=last {
            if !range.contains_row(row) {
                break;
            }
            let cells = (range.start_col.offset()..=range.end_col.offset())
                .map(|c| self.cells.get(&(row, c)).cloned().unwrap_or_default())
                .collect();
            grid.push(cells);
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
        if self.fail_writes_to_row == Some(cell.row) {
            return Err(TabularError::Write("quota exceeded".to_string()));
        }
        self.cells
            .insert((cell.row, cell.col.offset()), value.to_string());
        self.writes.push((cell, value.to_string()));
        Ok(())
    }

    fn append_row(
        &mut self,
        _sheet_id: &str,
        _sheet_name: &str,
        values: &[String],
    ) -> Result<u32, TabularError> {
        if self.fail_appends {
            return Err(TabularError::Write("sheet is protected".to_string()));
        }
        let row = self.last_row() + 1;
        for (c, value) in values.iter().enumerate() {
            if !value.is_empty() {
                self.cells.insert((row, c), value.clone());
            }
        }
        self.appended.push((row, values.to_vec()));
        Ok(row)
    }
}

/// Records every stored file; refuses filenames containing `fail_on`.
#[derive(Default)]
pub struct MemoryFiles {
    pub stored: RefCell<Vec<(String, Vec<u8>)>>,
    pub fail_on: Option<String>,
}

impl MemoryFiles {
    pub fn failing_on(pattern: &str) -> Self {
        MemoryFiles {
            stored: RefCell::new(Vec::new()),
            fail_on: Some(pattern.to_string()),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.stored.borrow().iter().map(|(n, _)| n.clone()).collect()
    }
}

impl FileStore for MemoryFiles {
    fn store(&self, request: &StoreRequest<'_>) -> Result<StoredFile, StoreError> {
        if let Some(pattern) = &self.fail_on {
            if request.filename.contains(pattern.as_str()) {
                return Err(StoreError::new("connection reset"));
            }
        }
        let mut stored = self.stored.borrow_mut();
        stored.push((request.filename.to_string(), request.bytes.to_vec()));
        let id = format!("file{}", stored.len());
        Ok(StoredFile {
            share_url: format!("https://files.example/{}", id),
            content_id: id,
        })
    }
}

pub struct GoodCredentials;

impl CredentialProvider for GoodCredentials {
    fn obtain(&self) -> Result<Credential, AuthError> {
        Ok(Credential::bearer("test-token"))
    }
}

pub struct MissingCredentials;

impl CredentialProvider for MissingCredentials {
    fn obtain(&self) -> Result<Credential, AuthError> {
        Err(AuthError::TokenMissing("token.json".into()))
    }
}
