use std::fs;
use submission_linker::submissions::{enumerate, mime_type};
use tempfile::TempDir;

#[test]
fn test_enumerate_lists_visible_files_in_order() -> std::io::Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("b.pdf"), b"bb")?;
    fs::write(dir.path().join("a.docx"), b"a")?;
    fs::write(dir.path().join(".DS_Store"), b"")?;
    fs::create_dir(dir.path().join("nested"))?;
    fs::write(dir.path().join("nested").join("c.pdf"), b"c")?;

    let files = enumerate(dir.path())?;
    let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["a.docx", "b.pdf"]);
    assert_eq!(files[1].len, 2);
    assert_eq!(files[0].path, dir.path().join("a.docx"));
    Ok(())
}

#[test]
fn test_enumerate_missing_folder() {
    let dir = TempDir::new().unwrap();
    assert!(enumerate(dir.path().join("missing")).is_err());
}

#[test]
fn test_mime_types() {
    assert_eq!(mime_type("essay.PDF"), "application/pdf");
    assert_eq!(mime_type("main.py"), "text/plain");
    assert_eq!(mime_type("project.zip"), "application/zip");
    assert_eq!(mime_type("README"), "application/octet-stream");
    assert_eq!(mime_type("data.bin"), "application/octet-stream");
}
