use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::PlanError;
use crate::planner::Plan;

/// Write `plan` as gzip-compressed bincode.
pub fn save_plan(plan: &Plan, path: impl AsRef<Path>) -> std::io::Result<()> {
    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, plan)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    writer
        .into_inner()
        .map_err(|e| e.into_error())?
        .finish()?
        .flush()?;

    Ok(())
}

pub fn load_plan(path: impl AsRef<Path>) -> Result<Plan, PlanError> {
    let path = path.as_ref();
    let unreadable = |reason: String| PlanError::Unreadable {
        path: path.to_path_buf(),
        reason,
    };
    let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
    let decoder = GzDecoder::new(file);
    let mut reader = BufReader::new(decoder);

    let plan: Plan = deserialize_from(&mut reader).map_err(|e| unreadable(e.to_string()))?;

    Ok(plan)
}

/// Compare a saved plan with one recomputed from the current inputs.
///
/// Files are compared by name and size, not path, so a plan saved from one
/// working directory can be checked from another.
pub fn check_drift(saved: &Plan, current: &Plan, path: impl AsRef<Path>) -> Result<(), PlanError> {
    let drift = |detail: String| PlanError::Drift {
        path: path.as_ref().to_path_buf(),
        detail,
    };

    if saved.entries.len() != current.entries.len() {
        return Err(drift(format!(
            "{} files were planned, {} found now",
            saved.entries.len(),
            current.entries.len()
        )));
    }
    for (before, now) in saved.entries.iter().zip(&current.entries) {
        if before.file.filename != now.file.filename {
            return Err(drift(format!(
                "expected {} but found {}",
                before.file.filename, now.file.filename
            )));
        }
        if before.file.len != now.file.len {
            return Err(drift(format!(
                "{} changed size ({} -> {} bytes)",
                now.file.filename, before.file.len, now.file.len
            )));
        }
        if before.decision != now.decision {
            return Err(drift(format!(
                "{} was planned as {:?}, now {:?}",
                now.file.filename, before.decision, now.decision
            )));
        }
    }
    Ok(())
}
