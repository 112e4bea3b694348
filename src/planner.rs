//! Turn a folder listing into an ordered plan of decisions.
//!
//! Planning is a pure function of the files, the gradebook snapshot and the match
//! tables. It never writes anywhere, so a dry run and a live run over the same
//! inputs always agree on every decision.

use crate::config::Precedence;
use crate::gradebook::GradebookSnapshot;
use crate::guard::{self, Verdict};
use crate::parser::{self, Identity};
use crate::resolver::{MatchMethod, Resolution, Resolver};
use crate::submissions::SubmissionFile;
use crate::tables::MatchTables;
use log::debug;
use serde::{Deserialize, Serialize};

/// What will happen to one file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    WillUpload {
        row: u32,
        identity: Identity,
        method: MatchMethod,
    },
    SkipConflict {
        row: u32,
        identity: Identity,
        method: MatchMethod,
    },
    SkipUnresolved {
        filename: String,
    },
    WillCreateRow {
        identity: Identity,
        method: MatchMethod,
    },
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::WillUpload { .. } => "upload",
            Decision::SkipConflict { .. } => "skip (conflict)",
            Decision::SkipUnresolved { .. } => "skip (unresolved)",
            Decision::WillCreateRow { .. } => "create row",
        }
    }

    /// Whether the executor acts on this decision.
    pub fn is_actionable(&self) -> bool {
        matches!(
            self,
            Decision::WillUpload { .. } | Decision::WillCreateRow { .. }
        )
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Decision::WillUpload { identity, .. }
            | Decision::SkipConflict { identity, .. }
            | Decision::WillCreateRow { identity, .. } => Some(identity),
            Decision::SkipUnresolved { .. } => None,
        }
    }

    pub fn method(&self) -> Option<MatchMethod> {
        match self {
            Decision::WillUpload { method, .. }
            | Decision::SkipConflict { method, .. }
            | Decision::WillCreateRow { method, .. } => Some(*method),
            Decision::SkipUnresolved { .. } => None,
        }
    }

    pub fn row(&self) -> Option<u32> {
        match self {
            Decision::WillUpload { row, .. } | Decision::SkipConflict { row, .. } => Some(*row),
            _ => None,
        }
    }
}

/// One file and what the planner decided for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub file: SubmissionFile,
    pub candidates: Vec<Identity>,
    pub decision: Decision,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCounts {
    pub total: usize,
    pub planned: usize,
    pub skipped_conflict: usize,
    pub skipped_unresolved: usize,
    pub new_rows: usize,
}

impl PlanCounts {
    fn record(&mut self, decision: &Decision) {
        self.total += 1;
        match decision {
            Decision::WillUpload { .. } => self.planned += 1,
            Decision::SkipConflict { .. } => self.skipped_conflict += 1,
            Decision::SkipUnresolved { .. } => self.skipped_unresolved += 1,
            Decision::WillCreateRow { .. } => self.new_rows += 1,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.planned + self.skipped_conflict + self.skipped_unresolved + self.new_rows
            == self.total
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub entries: Vec<PlanEntry>,
    pub counts: PlanCounts,
}

impl Plan {
    pub fn actionable(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.decision.is_actionable())
    }
}

/// Decide, for every file in enumeration order, whether and where it gets linked.
pub fn plan(
    files: &[SubmissionFile],
    gradebook: &GradebookSnapshot,
    tables: &MatchTables,
    precedence: Precedence,
) -> Plan {
    let resolver = Resolver::new(gradebook)
        .with_groups(tables.groups.as_ref())
        .with_precomputed(tables.precomputed.as_ref())
        .with_precedence(precedence);

    let mut result = Plan::default();
    for file in files {
        let candidates = parser::parse(&file.filename);
        let decision = decide(&file.filename, &candidates, &resolver, gradebook);
        debug!("{}: {} {:?}", file.filename, decision.label(), decision.identity());
        result.counts.record(&decision);
        result.entries.push(PlanEntry {
            file: file.clone(),
            candidates,
            decision,
        });
    }
    result
}

fn decide(
    filename: &str,
    candidates: &[Identity],
    resolver: &Resolver<'_>,
    gradebook: &GradebookSnapshot,
) -> Decision {
    match resolver.resolve(filename, candidates) {
        Resolution::Unresolved => Decision::SkipUnresolved {
            filename: filename.to_string(),
        },
        Resolution::NeedsNewRow { group, method } => Decision::WillCreateRow {
            identity: Identity::GroupName(group),
            method,
        },
        Resolution::Matched {
            row,
            identity,
            method,
        } => match guard::check(gradebook, row) {
            Verdict::Conflict => Decision::SkipConflict {
                row,
                identity,
                method,
            },
            Verdict::Clear => Decision::WillUpload {
                row,
                identity,
                method,
            },
        },
    }
}
