mod common;

use common::{col, gradebook_config};
use std::fs;
use submission_linker::cell::{CellRef, RangeSpec};
use submission_linker::config::Visibility;
use submission_linker::error::{RunError, TabularError};
use submission_linker::gradebook::load_snapshot;
use submission_linker::local::{CsvSheetStore, LocalFolderStore};
use submission_linker::remote::{FileStore, StoreRequest, TabularStore};
use tempfile::TempDir;

const GRADEBOOK: &str = "\
,First,Last,ID,,,,,,,,,Link
,Ali,Baba,816000001
,Aadam,Seenath,816050357,,,,,,,,,existing

,Sam,Lee,816000009
";

fn gradebook_file(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("gradebook.csv");
    fs::write(&path, GRADEBOOK).unwrap();
    path
}

#[test]
fn test_snapshot_from_csv_sheet() {
    let dir = TempDir::new().unwrap();
    let store = CsvSheetStore::open(gradebook_file(&dir)).unwrap();
    let snapshot = load_snapshot(&store, &gradebook_config()).unwrap();

    // Rows 2..=5, including the blank row 4
    assert_eq!(snapshot.len(), 4);
    let indices: Vec<u32> = snapshot.rows().iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![2, 3, 4, 5]);

    let aadam = snapshot.row(3).unwrap();
    assert_eq!(aadam.id, "816050357");
    assert_eq!(aadam.full_name(), "Aadam Seenath");
    assert_eq!(aadam.link, "existing");

    let blank = snapshot.row(4).unwrap();
    assert!(blank.id.is_empty() && blank.link.is_empty());
    assert_eq!(snapshot.find_by_id(" 816000009 ").map(|r| r.index), Some(5));
}

#[test]
fn test_missing_sheet_file_is_a_gradebook_error() {
    let dir = TempDir::new().unwrap();
    let err = CsvSheetStore::open(dir.path().join("missing.csv")).unwrap_err();
    assert!(matches!(err, TabularError::Read(_)));

    let err = RunError::from(err);
    assert!(err.to_string().starts_with("Cannot load gradebook: Read failed:"), "{}", err);
}

#[test]
fn test_read_range_respects_bounds() {
    let dir = TempDir::new().unwrap();
    let store = CsvSheetStore::open(gradebook_file(&dir)).unwrap();
    let range = RangeSpec::parse("D2:D3").unwrap();
    let grid = store.read_range("", "A1", &range).unwrap();
    assert_eq!(grid, vec![vec!["816000001".to_string()], vec!["816050357".to_string()]]);
}

#[test]
fn test_write_cell_rewrites_the_file() {
    let dir = TempDir::new().unwrap();
    let path = gradebook_file(&dir);
    let mut store = CsvSheetStore::open(&path).unwrap();
    store
        .write_cell("", "A1", CellRef::new(2, col("M")), "=HYPERLINK(\"u\", \"Open File\")")
        .unwrap();

    let reopened = CsvSheetStore::open(&path).unwrap();
    assert_eq!(reopened.rows()[1][12], "=HYPERLINK(\"u\", \"Open File\")");
    // Untouched rows survive the rewrite
    assert_eq!(reopened.rows()[2][12], "existing");
    assert_eq!(reopened.rows()[4][3], "816000009");
}

#[test]
fn test_multi_line_cell_keeps_row_numbers() {
    let dir = TempDir::new().unwrap();
    let path = gradebook_file(&dir);
    let mut store = CsvSheetStore::open(&path).unwrap();
    store
        .write_cell("", "A1", CellRef::new(2, col("M")), "see\nnotes")
        .unwrap();

    // Read back twice so the quoted line break goes through a second rewrite
    let mut reopened = CsvSheetStore::open(&path).unwrap();
    assert_eq!(reopened.rows()[1][12], "see\nnotes");
    reopened
        .write_cell("", "A1", CellRef::new(3, col("M")), "replaced")
        .unwrap();

    let reopened = CsvSheetStore::open(&path).unwrap();
    assert_eq!(reopened.rows().len(), 5);
    assert_eq!(reopened.rows()[1][12], "see\nnotes");
    assert_eq!(reopened.rows()[2][12], "replaced");
    assert_eq!(reopened.rows()[4][3], "816000009");

    let snapshot = load_snapshot(&reopened, &gradebook_config()).unwrap();
    assert_eq!(snapshot.find_by_id("816000009").map(|r| r.index), Some(5));
    assert_eq!(snapshot.row(2).map(|r| r.link.as_str()), Some("see\nnotes"));
}

#[test]
fn test_append_row_goes_after_last_used_row() {
    let dir = TempDir::new().unwrap();
    let path = gradebook_file(&dir);
    let mut store = CsvSheetStore::open(&path).unwrap();
    let row = store
        .append_row("", "A1", &["".into(), "".into(), "".into(), "TeamAlpha".into()])
        .unwrap();
    assert_eq!(row, 6);

    let reopened = CsvSheetStore::open(&path).unwrap();
    assert_eq!(reopened.rows()[5][3], "TeamAlpha");
}

#[test]
fn test_missing_gradebook_file() {
    let dir = TempDir::new().unwrap();
    assert!(CsvSheetStore::open(dir.path().join("nope.csv")).is_err());
}

#[test]
fn test_local_folder_store() {
    let dir = TempDir::new().unwrap();
    let store = LocalFolderStore::new(dir.path().join("uploaded"));
    let request = StoreRequest {
        bytes: b"essay",
        filename: "Aadam Seenath A1.pdf",
        folder_id: "folder123",
        mime_type: "application/pdf",
        visibility: Visibility::AnyoneWithLink,
    };

    let first = store.store(&request).unwrap();
    let second = store.store(&request).unwrap();
    assert_ne!(first.content_id, second.content_id);
    assert!(first.share_url.starts_with("file://"));

    let copy = dir
        .path()
        .join("uploaded")
        .join("folder123")
        .join(format!("{}_Aadam Seenath A1.pdf", first.content_id));
    assert_eq!(fs::read(copy).unwrap(), b"essay");
}
