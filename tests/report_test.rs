mod common;

use chrono::{Local, TimeZone};
use common::{file, gradebook_config, row, snapshot, upload_config};
use std::fs;
use std::path::PathBuf;
use submission_linker::config::{BackendConfig, MatchingConfig, Precedence, RunConfig};
use submission_linker::error::PlanError;
use submission_linker::executor::{ExecutionLog, Outcome, Stage};
use submission_linker::gradebook::GradebookSnapshot;
use submission_linker::planner::{Decision, Plan, plan};
use submission_linker::report::{Mode, ReportBuilder, match_table, write_report};
use submission_linker::resolver::MatchMethod;
use submission_linker::saving::{check_drift, load_plan, save_plan};
use submission_linker::suggest::Quality;
use submission_linker::parser::Identity;
use submission_linker::tables::{GroupMapping, MatchTables, PrecomputedMatches};
use tempfile::TempDir;

const AADAM: &str = "Aadam Seenath_1835025_assignsubmission_file_816050357_COMP1600_A1.pdf";

fn gradebook() -> GradebookSnapshot {
    snapshot(vec![
        row(2, "816000001", "Ali", "Baba", "https://files.example/old"),
        row(5, "816050357", "Aadam", "Seenath", ""),
    ])
}

fn sample_plan(book: &GradebookSnapshot) -> Plan {
    let files = vec![file(AADAM), file("816040296_A2.pdf"), file("Ali Baba A1.pdf")];
    plan(&files, book, &MatchTables::default(), Precedence::GroupFirst)
}

fn run_config() -> RunConfig {
    RunConfig {
        gradebook: gradebook_config(),
        folder: PathBuf::from("submissions"),
        upload: upload_config(),
        matching: MatchingConfig::default(),
        token_file: PathBuf::from("token.json"),
        report_path: PathBuf::from("upload_summary.txt"),
        backend: BackendConfig::Google,
    }
}

#[test]
fn test_dry_run_report() {
    let book = gradebook();
    let plan = sample_plan(&book);
    let report = ReportBuilder::new(&plan, &book).build();
    assert_eq!(report.mode, Mode::DryRun);

    let text = report.render();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        &lines[..5],
        &[
            "Total files: 3",
            "Planned uploads: 1",
            "Skipped (conflict): 1",
            "Skipped (unresolved): 1",
            "New rows: 0",
        ]
    );
    assert!(lines.contains(&format!("{} | upload to row 5 | 816050357 | id-exact | dry run", AADAM).as_str()));
    assert!(lines.contains(&"816040296_A2.pdf | skip (unresolved) | - | - | -"));
    assert!(lines.contains(&"Ali Baba A1.pdf | skip (conflict at row 2) | Ali Baba | name-exact | -"));
    assert!(text.contains("Suggestions for unresolved files:\n  816040296_A2.pdf -> "));

    // Rendering is a pure function of the plan
    assert_eq!(text, ReportBuilder::new(&plan, &book).build().render());
}

#[test]
fn test_unresolved_file_gets_a_suggestion() {
    let book = gradebook();
    let plan = sample_plan(&book);
    let report = ReportBuilder::new(&plan, &book).build();

    let suggestion = report.lines[1].suggestion.as_ref().unwrap();
    assert!(suggestion.score >= 0.5 && suggestion.score < 0.7, "{}", suggestion.score);
    assert_eq!(suggestion.quality, Quality::Fair);
    // Only unresolved files carry suggestions
    assert!(report.lines[0].suggestion.is_none());
    assert!(report.lines[2].suggestion.is_none());
}

#[test]
fn test_live_report_shares_the_dry_run_lines() {
    let book = gradebook();
    let plan = sample_plan(&book);
    let log = ExecutionLog {
        outcomes: vec![
            Some(Outcome::Uploaded {
                row: 5,
                content_id: "file1".into(),
                url: "https://files.example/file1".into(),
                created_row: false,
            }),
            None,
            None,
        ],
        rows_created: 0,
    };

    let dry = ReportBuilder::new(&plan, &book).build();
    let live = ReportBuilder::new(&plan, &book).with_execution(&log).build();
    assert_eq!(live.mode, Mode::Live);

    let text = live.render();
    assert!(text.contains("Uploaded successfully: 1\nFailed: 0\nRows created: 0\n"));
    assert!(text.contains(&format!(
        "{} | upload to row 5 | 816050357 | id-exact | uploaded to row 5 (https://files.example/file1)",
        AADAM
    )));

    // Same decisions, identities and methods as the dry run
    for (a, b) in dry.lines.iter().zip(&live.lines) {
        assert_eq!(
            (&a.filename, &a.decision, &a.identity, a.method),
            (&b.filename, &b.decision, &b.identity, b.method)
        );
    }
}

#[test]
fn test_failed_outcome_in_report() {
    let book = gradebook();
    let plan = sample_plan(&book);
    let log = ExecutionLog {
        outcomes: vec![
            Some(Outcome::Failed {
                stage: Stage::Store,
                message: "connection reset".into(),
            }),
            None,
            None,
        ],
        rows_created: 0,
    };
    let text = ReportBuilder::new(&plan, &book)
        .with_execution(&log)
        .build()
        .render();
    assert!(text.contains("Failed: 1"));
    assert!(text.contains("| failed at store: connection reset"));
}

#[test]
fn test_report_artifact() -> std::io::Result<()> {
    let book = gradebook();
    let plan = sample_plan(&book);
    let report = ReportBuilder::new(&plan, &book).build();
    let generated = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

    let text = report.render_artifact(&run_config(), generated);
    assert!(text.starts_with("Upload Summary\n"));
    assert!(text.contains("Mode: dry run\n"));
    assert!(text.contains("Sheet ID: sheet123\n"));
    assert!(text.contains("ID Column: D\n"));
    assert!(text.contains("Link Column: M\n"));
    assert!(text.contains("Folder ID: folder123\n"));
    assert!(text.contains("Date: 2024-01-02 03:04:05\n"));
    assert!(text.ends_with(&report.render()));

    let dir = TempDir::new()?;
    let path = dir.path().join("upload_summary.txt");
    write_report(&path, &text)?;
    assert_eq!(fs::read_to_string(&path)?, text);
    Ok(())
}

#[test]
fn test_match_table_round_trips_through_precomputed_matches() {
    let book = gradebook();
    let original = sample_plan(&book);
    let table = match_table(&original, &book);

    let mut lines = table.lines();
    assert_eq!(lines.next(), Some("filename,matched_id,method,suggested,quality"));
    assert_eq!(lines.next(), Some(format!("{},816050357,id-exact,,", AADAM).as_str()));
    assert!(lines.next().unwrap().starts_with("816040296_A2.pdf,NO MATCH,,"));
    assert_eq!(lines.next(), Some("Ali Baba A1.pdf,816000001,name-exact,,"));

    // Feeding the table back makes every decision precomputed
    let tables = MatchTables {
        groups: None,
        precomputed: Some(PrecomputedMatches::from_csv(&table).unwrap()),
    };
    let files: Vec<_> = original.entries.iter().map(|e| e.file.clone()).collect();
    let replanned = plan(&files, &book, &tables, Precedence::GroupFirst);
    assert_eq!(replanned.entries[0].decision.method(), Some(MatchMethod::Precomputed));
    assert_eq!(replanned.entries[0].decision.row(), Some(5));
    assert!(matches!(
        replanned.entries[1].decision,
        Decision::SkipUnresolved { .. }
    ));
    assert_eq!(replanned.counts, original.counts);
}

#[test]
fn test_exported_new_group_row_survives_without_group_mapping() {
    let book = gradebook();
    let mut groups = GroupMapping::new();
    groups.insert("Jane", "Doe", "TeamAlpha");
    let with_groups = MatchTables {
        groups: Some(groups),
        precomputed: None,
    };
    let files = vec![file("Jane Doe project.zip")];
    let original = plan(&files, &book, &with_groups, Precedence::GroupFirst);
    assert!(matches!(
        original.entries[0].decision,
        Decision::WillCreateRow { .. }
    ));

    let table = match_table(&original, &book);
    assert!(table.contains("Jane Doe project.zip,TeamAlpha,group-mapped,,\n"));

    // The exported table alone is enough, no groups.csv needed
    let tables = MatchTables {
        groups: None,
        precomputed: Some(PrecomputedMatches::from_csv(&table).unwrap()),
    };
    let replanned = plan(&files, &book, &tables, Precedence::GroupFirst);
    assert_eq!(
        replanned.entries[0].decision,
        Decision::WillCreateRow {
            identity: Identity::GroupName("TeamAlpha".into()),
            method: MatchMethod::Precomputed,
        }
    );
    assert_eq!(replanned.counts.new_rows, 1);

    // Exporting the re-planned table keeps the group label
    assert_eq!(match_table(&replanned, &book), table);
}

#[test]
fn test_saved_plan_round_trip_and_drift() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plan.bin.gz");
    let book = gradebook();
    let saved = sample_plan(&book);

    save_plan(&saved, &path).unwrap();
    let loaded = load_plan(&path).unwrap();
    assert_eq!(loaded, saved);
    assert!(check_drift(&loaded, &saved, &path).is_ok());

    // The link cell of row 5 filled in since the plan was saved
    let changed = snapshot(vec![
        row(2, "816000001", "Ali", "Baba", "https://files.example/old"),
        row(5, "816050357", "Aadam", "Seenath", "someone else"),
    ]);
    let current = sample_plan(&changed);
    match check_drift(&loaded, &current, &path) {
        Err(PlanError::Drift { detail, .. }) => assert!(detail.contains(AADAM), "{}", detail),
        other => panic!("expected drift, got {:?}", other),
    }

    let mut fewer = saved.clone();
    fewer.entries.pop();
    assert!(matches!(
        check_drift(&saved, &fewer, &path),
        Err(PlanError::Drift { .. })
    ));
}

#[test]
fn test_unreadable_saved_plan() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        load_plan(dir.path().join("missing.bin.gz")),
        Err(PlanError::Unreadable { .. })
    ));

    let garbage = dir.path().join("garbage.bin.gz");
    fs::write(&garbage, b"definitely not gzip").unwrap();
    assert!(matches!(load_plan(&garbage), Err(PlanError::Unreadable { .. })));
}
