//! Run configuration.
//!
//! `config.json` is deserialized into [`AppConfig`] as-is and then validated into
//! the typed values ([`GradebookConfig`], [`MatchingConfig`], ...) that are threaded
//! explicitly into each component. Nothing reads configuration from ambient state.

use crate::cell::{Column, RangeSpec};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_REPORT_FILE: &str = "upload_summary.txt";
pub const DEFAULT_TOKEN_FILE: &str = "token.json";

/// The raw shape of `config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gradebook: RawGradebook,
    pub submissions: RawSubmissions,
    pub upload: RawUpload,
    pub matching: RawMatching,
    pub authentication: RawAuthentication,
    pub report: RawReport,
    pub backend: Option<BackendConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawGradebook {
    pub sheet_id: String,
    pub sheet_name: String,
    pub id_column: Option<String>,
    pub first_name_column: Option<String>,
    pub last_name_column: Option<String>,
    pub link_column: Option<String>,
    pub start_row: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSubmissions {
    pub folder_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawUpload {
    pub folder_id: String,
    pub visibility: Visibility,
    pub link_style: LinkStyle,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMatching {
    pub groups_file: Option<PathBuf>,
    pub matches_file: Option<PathBuf>,
    pub precedence: Precedence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAuthentication {
    pub token_file: PathBuf,
}

impl Default for RawAuthentication {
    fn default() -> Self {
        RawAuthentication {
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawReport {
    pub path: PathBuf,
}

impl Default for RawReport {
    fn default() -> Self {
        RawReport {
            path: PathBuf::from(DEFAULT_REPORT_FILE),
        }
    }
}

/// Where the gradebook and the uploaded files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    Local {
        gradebook_csv: PathBuf,
        upload_dir: PathBuf,
    },
    Google,
}

/// Sharing applied to each uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    #[default]
    AnyoneWithLink,
}

/// What gets written into the link cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStyle {
    #[default]
    Hyperlink,
    Url,
}

impl LinkStyle {
    pub fn cell_value(self, url: &str) -> String {
        match self {
            LinkStyle::Hyperlink => format!("=HYPERLINK(\"{}\", \"Open File\")", url),
            LinkStyle::Url => url.to_string(),
        }
    }
}

/// Ordering between group mapping and direct name matching for a person name.
/// Precomputed matches always come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    #[default]
    GroupFirst,
    NameFirst,
}

/// Validated gradebook coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradebookConfig {
    pub sheet_id: String,
    pub sheet_name: String,
    pub id_column: Column,
    pub first_name_column: Option<Column>,
    pub last_name_column: Option<Column>,
    pub link_column: Column,
    pub start_row: u32,
}

impl GradebookConfig {
    pub fn validate(raw: &RawGradebook) -> Result<Self, ConfigError> {
        let id_column = required_column("gradebook.id_column", raw.id_column.as_deref())?;
        let link_column = required_column("gradebook.link_column", raw.link_column.as_deref())?;
        let first_name_column =
            optional_column("gradebook.first_name_column", raw.first_name_column.as_deref())?;
        let last_name_column =
            optional_column("gradebook.last_name_column", raw.last_name_column.as_deref())?;

        let start_row = raw.start_row.ok_or(ConfigError::Missing("gradebook.start_row"))?;
        if start_row == 0 {
            return Err(ConfigError::InvalidStartRow(start_row));
        }
        if raw.sheet_name.trim().is_empty() {
            return Err(ConfigError::Missing("gradebook.sheet_name"));
        }

        let named = [
            ("gradebook.id_column", Some(id_column)),
            ("gradebook.first_name_column", first_name_column),
            ("gradebook.last_name_column", last_name_column),
            ("gradebook.link_column", Some(link_column)),
        ];
        for (i, (first, a)) in named.iter().enumerate() {
            for (second, b) in &named[i + 1..] {
                if let (Some(a), Some(b)) = (a, b) {
                    if a == b {
                        return Err(ConfigError::DuplicateColumn {
                            first: *first,
                            second: *second,
                            letter: a.letters(),
                        });
                    }
                }
            }
        }

        Ok(GradebookConfig {
            sheet_id: raw.sheet_id.trim().to_string(),
            sheet_name: raw.sheet_name.trim().to_string(),
            id_column,
            first_name_column,
            last_name_column,
            link_column,
            start_row,
        })
    }

    /// All configured columns, leftmost first.
    pub fn columns(&self) -> Vec<Column> {
        let mut columns = vec![self.id_column, self.link_column];
        columns.extend(self.first_name_column);
        columns.extend(self.last_name_column);
        columns.sort();
        columns
    }

    /// The range that covers every configured column from the start row down.
    pub fn snapshot_range(&self) -> RangeSpec {
        let columns = self.columns();
        RangeSpec::open_ended(columns[0], columns[columns.len() - 1], self.start_row)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub folder_id: String,
    pub visibility: Visibility,
    pub link_style: LinkStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchingConfig {
    pub groups_file: Option<PathBuf>,
    pub matches_file: Option<PathBuf>,
    pub precedence: Precedence,
}

/// Everything a run needs, validated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub gradebook: GradebookConfig,
    pub folder: PathBuf,
    pub upload: UploadConfig,
    pub matching: MatchingConfig,
    pub token_file: PathBuf,
    pub report_path: PathBuf,
    pub backend: BackendConfig,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<RunConfig, ConfigError> {
        let gradebook = GradebookConfig::validate(&self.gradebook)?;
        let folder = self
            .submissions
            .folder_path
            .clone()
            .ok_or(ConfigError::Missing("submissions.folder_path"))?;
        let backend = self
            .backend
            .clone()
            .ok_or(ConfigError::Missing("backend"))?;
        if backend == BackendConfig::Google && gradebook.sheet_id.is_empty() {
            return Err(ConfigError::Missing("gradebook.sheet_id"));
        }

        Ok(RunConfig {
            gradebook,
            folder,
            upload: UploadConfig {
                folder_id: self.upload.folder_id.trim().to_string(),
                visibility: self.upload.visibility,
                link_style: self.upload.link_style,
            },
            matching: MatchingConfig {
                groups_file: self.matching.groups_file.clone(),
                matches_file: self.matching.matches_file.clone(),
                precedence: self.matching.precedence,
            },
            token_file: self.authentication.token_file.clone(),
            report_path: self.report.path.clone(),
            backend,
        })
    }
}

fn required_column(field: &'static str, value: Option<&str>) -> Result<Column, ConfigError> {
    optional_column(field, value)?.ok_or(ConfigError::Missing(field))
}

fn optional_column(field: &'static str, value: Option<&str>) -> Result<Option<Column>, ConfigError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(letters) => Column::from_letters(letters)
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidColumn {
                field,
                value: letters.to_string(),
            }),
    }
}
