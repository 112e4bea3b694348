//! Apply a plan: store each file, then link it from its gradebook row.
//!
//! Entries run one at a time in plan order. A failure is recorded against its own
//! file and the batch carries on with the next one. The only fatal error is a
//! missing credential, which is checked before anything is stored.

use crate::cell::CellRef;
use crate::config::{GradebookConfig, UploadConfig};
use crate::error::AuthError;
use crate::gradebook::{GradebookSnapshot, LiveGradebook};
use crate::guard::{self, Verdict};
use crate::parser::Identity;
use crate::planner::{Decision, Plan, PlanEntry};
use crate::remote::{CredentialProvider, FileStore, StoreRequest, StoredFile, TabularStore};
use crate::submissions::mime_type;
use log::{info, warn};
use std::fmt;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The step at which an entry failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Read,
    Store,
    Link,
    AppendRow,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Read => "read",
            Stage::Store => "store",
            Stage::Link => "link",
            Stage::AppendRow => "append row",
        })
    }
}

/// What happened to one actionable entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Uploaded {
        row: u32,
        content_id: String,
        url: String,
        created_row: bool,
    },
    /// The row was filled earlier in this run by another file.
    SkippedConflict { row: u32 },
    Failed { stage: Stage, message: String },
    Cancelled,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Uploaded { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Uploaded {
                row,
                url,
                created_row: true,
                ..
            } => write!(f, "uploaded to new row {} ({})", row, url),
            Outcome::Uploaded { row, url, .. } => write!(f, "uploaded to row {} ({})", row, url),
            Outcome::SkippedConflict { row } => {
                write!(f, "skipped: row {} was linked earlier in this run", row)
            }
            Outcome::Failed { stage, message } => write!(f, "failed at {}: {}", stage, message),
            Outcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Outcomes aligned with the plan's entries; `None` for entries never executed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionLog {
    pub outcomes: Vec<Option<Outcome>>,
    pub rows_created: usize,
}

impl ExecutionLog {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().flatten().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .flatten()
            .filter(|o| matches!(o, Outcome::Failed { .. }))
            .count()
    }
}

pub struct UploadExecutor<'a> {
    gradebook: &'a GradebookConfig,
    upload: &'a UploadConfig,
    files: &'a dyn FileStore,
    sheet: &'a mut dyn TabularStore,
    cancel: Arc<AtomicBool>,
}

impl<'a> UploadExecutor<'a> {
    pub fn new(
        gradebook: &'a GradebookConfig,
        upload: &'a UploadConfig,
        files: &'a dyn FileStore,
        sheet: &'a mut dyn TabularStore,
    ) -> Self {
        UploadExecutor {
            gradebook,
            upload,
            files,
            sheet,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a cancel flag. Once it is set no new entry is started.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn execute(
        &mut self,
        plan: &Plan,
        snapshot: &GradebookSnapshot,
        credentials: &dyn CredentialProvider,
    ) -> Result<ExecutionLog, AuthError> {
        credentials.obtain()?;

        let mut live = LiveGradebook::new(snapshot);
        let mut outcomes = Vec::with_capacity(plan.entries.len());
        for entry in &plan.entries {
            let Some(outcome) = self.apply(entry, &mut live) else {
                outcomes.push(None);
                continue;
            };
            match &outcome {
                Outcome::Uploaded { row, .. } => {
                    info!("Uploaded {} -> row {}", entry.file.filename, row)
                }
                Outcome::Failed { .. } => warn!("{}: {}", entry.file.filename, outcome),
                _ => info!("{}: {}", entry.file.filename, outcome),
            }
            outcomes.push(Some(outcome));
        }

        Ok(ExecutionLog {
            outcomes,
            rows_created: live.created_rows(),
        })
    }

    /// `None` for decisions the executor never acts on.
    fn apply(&mut self, entry: &PlanEntry, live: &mut LiveGradebook<'_>) -> Option<Outcome> {
        if !entry.decision.is_actionable() {
            return None;
        }
        if self.cancel.load(Ordering::SeqCst) {
            return Some(Outcome::Cancelled);
        }
        match &entry.decision {
            Decision::WillUpload { row, .. } => Some(self.link_existing(entry, *row, live)),
            Decision::WillCreateRow { identity, .. } => {
                let key = identity_key(identity);
                Some(match live.created_row(&key) {
                    Some(row) => self.link_existing(entry, row, live),
                    None => self.link_new_row(entry, &key, live),
                })
            }
            Decision::SkipConflict { .. } | Decision::SkipUnresolved { .. } => None,
        }
    }

    fn link_existing(
        &mut self,
        entry: &PlanEntry,
        row: u32,
        live: &mut LiveGradebook<'_>,
    ) -> Outcome {
        if guard::check(&*live, row) == Verdict::Conflict {
            return Outcome::SkippedConflict { row };
        }
        let stored = match self.store(entry) {
            Ok(stored) => stored,
            Err(failure) => return failure,
        };
        let value = self.upload.link_style.cell_value(&stored.share_url);
        let cell = CellRef::new(row, self.gradebook.link_column);
        if let Err(e) = self.sheet.write_cell(
            &self.gradebook.sheet_id,
            &self.gradebook.sheet_name,
            cell,
            &value,
        ) {
            return Outcome::Failed {
                stage: Stage::Link,
                message: format!("stored as {} but not linked: {}", stored.share_url, e),
            };
        }
        live.record_link(row, value);
        Outcome::Uploaded {
            row,
            content_id: stored.content_id,
            url: stored.share_url,
            created_row: false,
        }
    }

    fn link_new_row(
        &mut self,
        entry: &PlanEntry,
        identity: &str,
        live: &mut LiveGradebook<'_>,
    ) -> Outcome {
        let stored = match self.store(entry) {
            Ok(stored) => stored,
            Err(failure) => return failure,
        };
        let value = self.upload.link_style.cell_value(&stored.share_url);
        let id_col = self.gradebook.id_column.offset();
        let link_col = self.gradebook.link_column.offset();
        let mut values = vec![String::new(); id_col.max(link_col) + 1];
        values[id_col] = identity.to_string();
        values[link_col] = value.clone();

        match self.sheet.append_row(
            &self.gradebook.sheet_id,
            &self.gradebook.sheet_name,
            &values,
        ) {
            Ok(row) => {
                live.record_new_row(identity, row, value);
                Outcome::Uploaded {
                    row,
                    content_id: stored.content_id,
                    url: stored.share_url,
                    created_row: true,
                }
            }
            Err(e) => Outcome::Failed {
                stage: Stage::AppendRow,
                message: format!("stored as {} but no row was added: {}", stored.share_url, e),
            },
        }
    }

    fn store(&self, entry: &PlanEntry) -> Result<StoredFile, Outcome> {
        let bytes = fs::read(&entry.file.path).map_err(|e| Outcome::Failed {
            stage: Stage::Read,
            message: format!("{}: {}", entry.file.path.display(), e),
        })?;
        let request = StoreRequest {
            bytes: &bytes,
            filename: &entry.file.filename,
            folder_id: &self.upload.folder_id,
            mime_type: mime_type(&entry.file.filename),
            visibility: self.upload.visibility,
        };
        self.files.store(&request).map_err(|e| Outcome::Failed {
            stage: Stage::Store,
            message: e.to_string(),
        })
    }
}

/// The text written into the id column for a new row.
fn identity_key(identity: &Identity) -> String {
    identity.to_string().trim().to_string()
}
