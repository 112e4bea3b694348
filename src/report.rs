//! Human-readable run reports and the exported match table.
//!
//! The report body (counts plus one line per file) comes from [`Report::render`],
//! which is the same for a dry run and a live run; a live run only fills in the
//! outcome column and two extra counts.

use crate::config::RunConfig;
use crate::executor::ExecutionLog;
use crate::gradebook::GradebookSnapshot;
use crate::planner::{Decision, Plan, PlanCounts};
use crate::resolver::MatchMethod;
use crate::suggest::{self, Suggestion};
use crate::tables::{NO_MATCH, write_csv};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    DryRun,
    Live,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::DryRun => "dry run",
            Mode::Live => "live",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReportLine {
    pub filename: String,
    pub decision: String,
    pub identity: Option<String>,
    pub method: Option<&'static str>,
    pub outcome: String,
    pub suggestion: Option<Suggestion>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub rows_created: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub mode: Mode,
    pub counts: PlanCounts,
    pub execution: Option<ExecutionCounts>,
    pub lines: Vec<ReportLine>,
}

/// Accumulates per-file lines from a plan and, for live runs, its outcomes.
#[derive(Debug)]
pub struct ReportBuilder {
    report: Report,
}

impl ReportBuilder {
    pub fn new(plan: &Plan, gradebook: &GradebookSnapshot) -> Self {
        let lines = plan
            .entries
            .iter()
            .map(|entry| {
                let decision = &entry.decision;
                let suggestion = match decision {
                    Decision::SkipUnresolved { .. } => {
                        suggest::closest(&entry.file.filename, &entry.candidates, gradebook)
                    }
                    _ => None,
                };
                ReportLine {
                    filename: entry.file.filename.clone(),
                    decision: describe(decision),
                    identity: decision.identity().map(|i| i.to_string()),
                    method: decision.method().map(|m| m.as_str()),
                    outcome: if decision.is_actionable() {
                        "pending".to_string()
                    } else {
                        "-".to_string()
                    },
                    suggestion,
                }
            })
            .collect();
        ReportBuilder {
            report: Report {
                mode: Mode::DryRun,
                counts: plan.counts,
                execution: None,
                lines,
            },
        }
    }

    /// Fold in execution outcomes; the log must come from the same plan.
    pub fn with_execution(mut self, log: &ExecutionLog) -> Self {
        self.report.mode = Mode::Live;
        for (line, outcome) in self.report.lines.iter_mut().zip(&log.outcomes) {
            if let Some(outcome) = outcome {
                line.outcome = outcome.to_string();
            }
        }
        self.report.execution = Some(ExecutionCounts {
            succeeded: log.succeeded(),
            failed: log.failed(),
            rows_created: log.rows_created,
        });
        self
    }

    pub fn build(self) -> Report {
        self.report
    }
}

fn describe(decision: &Decision) -> String {
    match decision {
        Decision::WillUpload { row, .. } => format!("upload to row {}", row),
        Decision::SkipConflict { row, .. } => format!("skip (conflict at row {})", row),
        Decision::SkipUnresolved { .. } => "skip (unresolved)".to_string(),
        Decision::WillCreateRow { .. } => "create row".to_string(),
    }
}

impl Report {
    /// Counts and per-file lines. Contains nothing time- or machine-dependent.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let c = &self.counts;
        let _ = writeln!(out, "Total files: {}", c.total);
        let _ = writeln!(out, "Planned uploads: {}", c.planned);
        let _ = writeln!(out, "Skipped (conflict): {}", c.skipped_conflict);
        let _ = writeln!(out, "Skipped (unresolved): {}", c.skipped_unresolved);
        let _ = writeln!(out, "New rows: {}", c.new_rows);
        if let Some(e) = &self.execution {
            let _ = writeln!(out, "Uploaded successfully: {}", e.succeeded);
            let _ = writeln!(out, "Failed: {}", e.failed);
            let _ = writeln!(out, "Rows created: {}", e.rows_created);
        }

        out.push('\n');
        for line in &self.lines {
            let outcome = match (self.mode, line.outcome.as_str()) {
                (Mode::DryRun, "pending") => "dry run",
                (_, outcome) => outcome,
            };
            let _ = writeln!(
                out,
                "{} | {} | {} | {} | {}",
                line.filename,
                line.decision,
                line.identity.as_deref().unwrap_or("-"),
                line.method.unwrap_or("-"),
                outcome
            );
        }

        let suggestions: Vec<_> = self
            .lines
            .iter()
            .filter_map(|l| l.suggestion.as_ref().map(|s| (&l.filename, s)))
            .collect();
        if !suggestions.is_empty() {
            out.push_str("\nSuggestions for unresolved files:\n");
            for (filename, s) in suggestions {
                let _ = writeln!(
                    out,
                    "  {} -> {} (row {}, {} {:.2})",
                    filename, s.label, s.row, s.quality, s.score
                );
            }
        }
        out
    }

    /// The full report file: a header describing the run, then [`Report::render`].
    pub fn render_artifact(&self, config: &RunConfig, generated: DateTime<Local>) -> String {
        let g = &config.gradebook;
        let optional = |c: Option<crate::cell::Column>| {
            c.map(|c| c.letters()).unwrap_or_else(|| "-".to_string())
        };
        let mut out = String::new();
        out.push_str("Upload Summary\n--------------\n\n");
        let _ = writeln!(out, "Mode: {}", self.mode.as_str());
        let _ = writeln!(out, "Folder path: {}", config.folder.display());
        let _ = writeln!(out, "Sheet ID: {}", g.sheet_id);
        let _ = writeln!(out, "Sheet Name: {}", g.sheet_name);
        let _ = writeln!(out, "ID Column: {}", g.id_column);
        let _ = writeln!(out, "First Name Column: {}", optional(g.first_name_column));
        let _ = writeln!(out, "Last Name Column: {}", optional(g.last_name_column));
        let _ = writeln!(out, "Link Column: {}", g.link_column);
        let _ = writeln!(out, "Start Row: {}", g.start_row);
        let _ = writeln!(out, "Folder ID: {}", config.upload.folder_id);
        let _ = writeln!(out, "Date: {}\n", generated.format("%Y-%m-%d %H:%M:%S"));
        out.push_str(&self.render());
        out
    }
}

pub fn write_report(path: impl AsRef<Path>, text: &str) -> io::Result<()> {
    fs::write(path, text)
}

/// A match table that [`crate::tables::PrecomputedMatches`] can read back.
///
/// Resolved files carry their row's id (or "First Last" when the id cell is
/// empty); unresolved files carry `NO MATCH` plus the best suggestion.
pub fn match_table(plan: &Plan, gradebook: &GradebookSnapshot) -> String {
    let mut rows = vec![vec![
        "filename".to_string(),
        "matched_id".to_string(),
        "method".to_string(),
        "suggested".to_string(),
        "quality".to_string(),
    ]];
    for entry in &plan.entries {
        let decision = &entry.decision;
        let matched = match decision {
            Decision::WillUpload { row, identity, .. }
            | Decision::SkipConflict { row, identity, .. } => gradebook
                .row(*row)
                .map(|r| {
                    if r.id.trim().is_empty() {
                        r.full_name()
                    } else {
                        r.id.trim().to_string()
                    }
                })
                .unwrap_or_else(|| identity.to_string()),
            Decision::WillCreateRow { identity, .. } => identity.to_string(),
            Decision::SkipUnresolved { .. } => NO_MATCH.to_string(),
        };
        let suggestion = match decision {
            Decision::SkipUnresolved { .. } => {
                suggest::closest(&entry.file.filename, &entry.candidates, gradebook)
            }
            _ => None,
        };
        // New rows are only ever made for groups; the label keeps that across a re-read
        let method = match decision {
            Decision::WillCreateRow { .. } => Some(MatchMethod::GroupMapped),
            _ => decision.method(),
        };
        rows.push(vec![
            entry.file.filename.clone(),
            matched,
            method.map(|m| m.as_str()).unwrap_or("").to_string(),
            suggestion.as_ref().map(|s| s.label.clone()).unwrap_or_default(),
            suggestion
                .as_ref()
                .map(|s| s.quality.as_str().to_string())
                .unwrap_or_default(),
        ]);
    }
    write_csv(&rows)
}
