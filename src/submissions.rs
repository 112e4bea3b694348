use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One file found in the submissions folder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFile {
    pub path: PathBuf,
    pub filename: String,
    pub len: u64,
}

impl SubmissionFile {
    pub fn new(path: impl Into<PathBuf>, filename: impl Into<String>, len: u64) -> Self {
        SubmissionFile {
            path: path.into(),
            filename: filename.into(),
            len,
        }
    }
}

/// List the regular, non-hidden files of `folder`, sorted by path.
///
/// Subdirectories are not descended into. Filenames that are not valid UTF-8 are
/// converted lossily, so they still show up (and fail to match) in the report.
pub fn enumerate(folder: impl AsRef<Path>) -> io::Result<Vec<SubmissionFile>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder.as_ref())? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        if filename.starts_with('.') {
            continue;
        }
        files.push(SubmissionFile {
            path: entry.path(),
            filename,
            len: metadata.len(),
        });
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// MIME type sent along with an upload, from the file extension.
pub fn mime_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" | "py" | "java" | "c" | "cpp" | "h" | "rs" | "md" => "text/plain",
        "rtf" => "application/rtf",
        "csv" => "text/csv",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "ipynb" => "application/x-ipynb+json",
        _ => "application/octet-stream",
    }
}
