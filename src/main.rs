use chrono::Local;
use clap::{ArgAction, Parser, Subcommand};
use log::{error, info, warn};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use submission_linker::config::{AppConfig, BackendConfig, DEFAULT_CONFIG_FILE, RunConfig};
use submission_linker::credentials::{LocalCredentials, TokenFileCredentials};
use submission_linker::error::{ConfigError, RunError};
use submission_linker::executor::UploadExecutor;
use submission_linker::gradebook::{GradebookSnapshot, load_snapshot};
use submission_linker::local::{CsvSheetStore, LocalFolderStore};
use submission_linker::planner::{self, Plan};
use submission_linker::remote::{CredentialProvider, FileStore, TabularStore};
use submission_linker::report::{ReportBuilder, match_table, write_report};
use submission_linker::saving::{check_drift, load_plan, save_plan};
use submission_linker::submissions;
use submission_linker::tables::MatchTables;

#[derive(Parser)]
#[command(name = "submission-linker")]
#[command(about = "Link submission files to their gradebook rows")]
struct Cli {
    /// -v for debug output, -vv for trace. RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Submissions folder, overriding submissions.folder_path.
    #[arg(long, global = true)]
    folder: Option<PathBuf>,
    #[arg(long, global = true)]
    report: Option<PathBuf>,
    #[arg(long, global = true)]
    groups: Option<PathBuf>,
    #[arg(long, global = true)]
    matches: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dry run: plan every file and write the report, without uploading.
    /// Nothing is stored or written remotely, but the google backend still
    /// needs a valid token to read the sheet.
    Plan {
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Upload and link every planned file.
    Upload {
        /// Abort if the plan differs from one saved with `plan --save`.
        #[arg(long)]
        expect_plan: Option<PathBuf>,
    },
    /// Write the current matches as a table usable as matching.matches_file.
    Matches {
        #[arg(long, default_value = "matches.csv")]
        out: PathBuf,
    },
    /// Check that the token file holds a usable token.
    CheckAuth,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn load_config(cli: &Cli) -> Result<RunConfig, ConfigError> {
    let mut app = AppConfig::load(&cli.config)?;
    if let Some(folder) = &cli.folder {
        app.submissions.folder_path = Some(folder.clone());
    }
    if let Some(report) = &cli.report {
        app.report.path = report.clone();
    }
    if let Some(groups) = &cli.groups {
        app.matching.groups_file = Some(groups.clone());
    }
    if let Some(matches) = &cli.matches {
        app.matching.matches_file = Some(matches.clone());
    }
    app.validate()
}

struct Backend {
    files: Box<dyn FileStore>,
    sheet: Box<dyn TabularStore>,
}

fn open_backend(config: &RunConfig, credentials: &dyn CredentialProvider) -> Result<Backend, RunError> {
    match &config.backend {
        BackendConfig::Local {
            gradebook_csv,
            upload_dir,
        } => Ok(Backend {
            files: Box::new(LocalFolderStore::new(upload_dir)),
            sheet: Box::new(CsvSheetStore::open(gradebook_csv)?),
        }),
        BackendConfig::Google => open_google(credentials),
    }
}

/// Reading the sheet is authenticated, so the token is needed even for a dry run.
#[cfg(feature = "google")]
fn open_google(credentials: &dyn CredentialProvider) -> Result<Backend, RunError> {
    use submission_linker::google::{DriveStore, SheetsStore};

    let credential = credentials.obtain()?;
    Ok(Backend {
        files: Box::new(DriveStore::new(credential.clone())),
        sheet: Box::new(SheetsStore::new(credential)),
    })
}

#[cfg(not(feature = "google"))]
fn open_google(_credentials: &dyn CredentialProvider) -> Result<Backend, RunError> {
    Err(ConfigError::BackendUnavailable("google".to_string()).into())
}

fn credential_provider(config: &RunConfig) -> Box<dyn CredentialProvider> {
    match config.backend {
        BackendConfig::Local { .. } => Box::new(LocalCredentials),
        BackendConfig::Google => Box::new(TokenFileCredentials::new(&config.token_file)),
    }
}

fn build_plan(config: &RunConfig, sheet: &dyn TabularStore) -> Result<(Plan, GradebookSnapshot), RunError> {
    let tables = MatchTables::load(&config.matching)?;
    let files = submissions::enumerate(&config.folder).map_err(|source| RunError::Folder {
        path: config.folder.clone(),
        source,
    })?;
    info!("Found {} files in {}", files.len(), config.folder.display());
    let snapshot = load_snapshot(sheet, &config.gradebook)?;
    let plan = planner::plan(&files, &snapshot, &tables, config.matching.precedence);
    Ok((plan, snapshot))
}

fn write_artifact(config: &RunConfig, text: &str) {
    match write_report(&config.report_path, text) {
        Ok(()) => info!("Report written to {}", config.report_path.display()),
        Err(e) => warn!("Cannot write report {}: {}", config.report_path.display(), e),
    }
}

fn output_error(path: &Path) -> impl FnOnce(std::io::Error) -> RunError + '_ {
    move |source| RunError::Output {
        path: path.to_path_buf(),
        source,
    }
}

fn run_plan(config: &RunConfig, save: Option<&Path>) -> Result<(), RunError> {
    let credentials = credential_provider(config);
    let backend = open_backend(config, &*credentials)?;
    let (plan, snapshot) = build_plan(config, &*backend.sheet)?;

    let report = ReportBuilder::new(&plan, &snapshot).build();
    print!("{}", report.render());
    write_artifact(config, &report.render_artifact(config, Local::now()));

    if let Some(path) = save {
        save_plan(&plan, path).map_err(output_error(path))?;
        info!("Plan saved to {}", path.display());
    }
    Ok(())
}

fn run_upload(config: &RunConfig, expect_plan: Option<&Path>) -> Result<(), RunError> {
    let credentials = credential_provider(config);
    let mut backend = open_backend(config, &*credentials)?;
    let (plan, snapshot) = build_plan(config, &*backend.sheet)?;

    if let Some(path) = expect_plan {
        let saved = load_plan(path)?;
        check_drift(&saved, &plan, path)?;
        info!("Plan matches {}", path.display());
    }

    let log = {
        let mut executor = UploadExecutor::new(
            &config.gradebook,
            &config.upload,
            &*backend.files,
            &mut *backend.sheet,
        );
        executor.execute(&plan, &snapshot, &*credentials)?
    };

    let report = ReportBuilder::new(&plan, &snapshot)
        .with_execution(&log)
        .build();
    print!("{}", report.render());
    write_artifact(config, &report.render_artifact(config, Local::now()));
    Ok(())
}

fn run_matches(config: &RunConfig, out: &Path) -> Result<(), RunError> {
    let credentials = credential_provider(config);
    let backend = open_backend(config, &*credentials)?;
    let (plan, snapshot) = build_plan(config, &*backend.sheet)?;
    fs::write(out, match_table(&plan, &snapshot)).map_err(output_error(out))?;
    println!("Wrote {} matches to {}", plan.entries.len(), out.display());
    Ok(())
}

fn run_check_auth(cli: &Cli) -> Result<(), RunError> {
    // The token file is all this command needs, so a missing config is fine.
    let app = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        AppConfig::default()
    };
    let path = &app.authentication.token_file;
    TokenFileCredentials::new(path).obtain()?;
    println!("Token in {} is valid", path.display());
    Ok(())
}

fn run(cli: &Cli) -> Result<(), RunError> {
    if let Commands::CheckAuth = cli.command {
        return run_check_auth(cli);
    }
    let config = load_config(cli)?;
    match &cli.command {
        Commands::Plan { save } => run_plan(&config, save.as_deref()),
        Commands::Upload { expect_plan } => run_upload(&config, expect_plan.as_deref()),
        Commands::Matches { out } => run_matches(&config, out),
        Commands::CheckAuth => Ok(()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    run(&cli).inspect_err(|e| error!("{}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_plan_help_mentions_the_token() {
        let command = Cli::command();
        let plan = command.find_subcommand("plan").unwrap();
        let about = plan.get_about().unwrap().to_string();
        assert!(about.starts_with("Dry run"), "{}", about);
        assert!(about.contains("needs a valid token"), "{}", about);
    }

    #[test]
    fn test_google_without_feature_or_token_fails_before_planning() {
        let dir = tempfile::TempDir::new().unwrap();
        let app: AppConfig = serde_json::from_str(&format!(
            r#"{{
              "gradebook": {{ "sheet_id": "sheet123", "sheet_name": "A1", "id_column": "D",
                             "link_column": "M", "start_row": 2 }},
              "submissions": {{ "folder_path": "submissions" }},
              "authentication": {{ "token_file": "{}" }},
              "backend": {{ "type": "google" }}
            }}"#,
            dir.path().join("token.json").display()
        ))
        .unwrap();
        let config = app.validate().unwrap();
        let credentials = credential_provider(&config);
        let result = open_backend(&config, &*credentials);
        if cfg!(feature = "google") {
            assert!(matches!(result, Err(RunError::Auth(_))));
        } else {
            assert!(matches!(
                result,
                Err(RunError::Config(ConfigError::BackendUnavailable(_)))
            ));
        }
    }
}
