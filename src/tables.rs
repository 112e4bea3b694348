//! File-backed lookup tables: the group mapping and the precomputed matches.
//!
//! Both are small CSV files read once per run. Headers are matched
//! case-insensitively after trimming, so `First name`, ` Group Name` and
//! `group_name` all work.

use crate::config::MatchingConfig;
use crate::error::ConfigError;
use crate::resolver::normalize_name;
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

const FIRST_NAME_HEADERS: &[&str] = &["first name", "first_name", "firstname", "first"];
const LAST_NAME_HEADERS: &[&str] = &["last name", "last_name", "lastname", "surname", "last"];
const GROUP_HEADERS: &[&str] = &["group name", "group_name", "groupname", "group"];
const FILENAME_HEADERS: &[&str] = &["filename", "file name", "file"];
const IDENTITY_HEADERS: &[&str] = &["matched_id", "identity", "id", "group name", "group"];
const METHOD_HEADERS: &[&str] = &["method", "match_method", "match method"];

/// The marker a match table uses for "this file has no owner".
pub const NO_MATCH: &str = "NO MATCH";

/// The optional tables a run consults, loaded once up front.
#[derive(Clone, Debug, Default)]
pub struct MatchTables {
    pub groups: Option<GroupMapping>,
    pub precomputed: Option<PrecomputedMatches>,
}

impl MatchTables {
    /// A configured table that cannot be read or parsed is a configuration error.
    pub fn load(config: &MatchingConfig) -> Result<Self, ConfigError> {
        let groups = config
            .groups_file
            .as_ref()
            .map(GroupMapping::load)
            .transpose()?;
        let precomputed = config
            .matches_file
            .as_ref()
            .map(PrecomputedMatches::load)
            .transpose()?;
        Ok(MatchTables {
            groups,
            precomputed,
        })
    }
}

/// Student name -> group name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupMapping {
    by_name: HashMap<(String, String), String>,
    groups: BTreeSet<String>,
}

impl GroupMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = read_table_file(path)?;
        let mapping = Self::from_csv(&text).map_err(|reason| ConfigError::MalformedTable {
            path: path.to_path_buf(),
            reason,
        })?;
        debug!("Loaded {} student-group mappings from {}", mapping.len(), path.display());
        Ok(mapping)
    }

    pub fn from_csv(text: &str) -> Result<Self, String> {
        let rows = read_csv(text);
        let Some((header, records)) = rows.split_first() else {
            return Err("table is empty".to_string());
        };
        let first_col = find_header(header, FIRST_NAME_HEADERS)
            .ok_or("no first name column")?;
        let last_col = find_header(header, LAST_NAME_HEADERS).ok_or("no last name column")?;
        let group_col = find_header(header, GROUP_HEADERS).ok_or("no group name column")?;

        let mut mapping = GroupMapping::new();
        for record in records {
            let field = |i: usize| record.get(i).map(|s| s.trim()).unwrap_or("");
            let (first, last, group) = (field(first_col), field(last_col), field(group_col));
            if group.is_empty() || (first.is_empty() && last.is_empty()) {
                continue;
            }
            mapping.insert(first, last, group);
        }
        Ok(mapping)
    }

    /// Later rows for the same student replace earlier ones.
    pub fn insert(&mut self, first: &str, last: &str, group: &str) {
        let group = group.trim().to_string();
        self.groups.insert(group.clone());
        self.by_name
            .insert((normalize_name(first), normalize_name(last)), group);
    }

    pub fn lookup(&self, first: &str, last: &str) -> Option<&str> {
        self.by_name
            .get(&(normalize_name(first), normalize_name(last)))
            .map(String::as_str)
    }

    pub fn contains_group(&self, name: &str) -> bool {
        self.groups.contains(name.trim())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// An authoritative answer for one filename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecomputedMatch {
    /// `None` when the table says the file has no owner.
    pub identity: Option<String>,
    /// How the table's author arrived at the match, if recorded.
    pub label: Option<String>,
}

/// Filename -> precomputed match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrecomputedMatches {
    entries: HashMap<String, PrecomputedMatch>,
}

impl PrecomputedMatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = read_table_file(path)?;
        let matches = Self::from_csv(&text).map_err(|reason| ConfigError::MalformedTable {
            path: path.to_path_buf(),
            reason,
        })?;
        debug!("Loaded {} precomputed matches from {}", matches.len(), path.display());
        Ok(matches)
    }

    pub fn from_csv(text: &str) -> Result<Self, String> {
        let rows = read_csv(text);
        let Some((header, records)) = rows.split_first() else {
            return Err("table is empty".to_string());
        };
        let file_col = find_header(header, FILENAME_HEADERS).ok_or("no filename column")?;
        let id_col = find_header(header, IDENTITY_HEADERS).ok_or("no identity column")?;
        let method_col = find_header(header, METHOD_HEADERS);

        let mut matches = PrecomputedMatches::new();
        for record in records {
            let Some(filename) = record.get(file_col).filter(|f| !f.is_empty()) else {
                continue;
            };
            let identity = record.get(id_col).map(|s| s.trim()).unwrap_or("");
            let label = method_col
                .and_then(|i| record.get(i))
                .map(|s| s.trim())
                .filter(|s| !s.is_empty());
            if matches.entries.contains_key(filename.as_str()) {
                warn!("Duplicate precomputed match for {:?}; keeping the first", filename);
                continue;
            }
            matches.insert(filename, identity, label);
        }
        Ok(matches)
    }

    /// An empty identity or `NO MATCH` records an authoritative "unresolved".
    pub fn insert(&mut self, filename: &str, identity: &str, label: Option<&str>) {
        let identity = identity.trim();
        let identity = if identity.is_empty() || identity.eq_ignore_ascii_case(NO_MATCH) {
            None
        } else {
            Some(identity.to_string())
        };
        self.entries.insert(
            filename.to_string(),
            PrecomputedMatch {
                identity,
                label: label.map(str::to_string),
            },
        );
    }

    pub fn get(&self, filename: &str) -> Option<&PrecomputedMatch> {
        self.entries.get(filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_table_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn find_header(header: &[String], names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

/// Split CSV text into records. Blank lines are dropped and a leading byte order
/// mark is ignored. Quoted fields may contain commas, doubled quotes and line
/// breaks.
pub fn read_csv(text: &str) -> Vec<Vec<String>> {
    split_records(text)
        .iter()
        .filter(|record| !record.trim().is_empty())
        .map(|record| parse_csv_row(record))
        .collect()
}

/// Break CSV text into raw records at line breaks outside quotes, keeping blank
/// records so record n stays line n of an unquoted file.
pub fn split_records(text: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in text.trim_start_matches('\u{feff}').chars() {
        match c {
            '"' => {
                // A doubled quote toggles twice and leaves the state unchanged
                in_quotes = !in_quotes;
                current.push(c);
            }
            '\n' if !in_quotes => {
                if current.ends_with('\r') {
                    current.pop();
                }
                records.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        records.push(current);
    }
    records
}

/// Parse one CSV line into its fields.
pub fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Doubled quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(std::mem::take(&mut current_field));
            }
            '\r' if !in_quotes && chars.peek().is_none() => {}
            _ => current_field.push(c),
        }
    }

    result.push(current_field);
    result
}

/// Quote a field when it holds a comma, quote or line break.
pub fn escape_csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render records as CSV, one line per record.
pub fn write_csv(rows: &[Vec<String>]) -> String {
    let mut csv_content = String::new();
    for row in rows {
        let line: Vec<String> = row.iter().map(|f| escape_csv_field(f)).collect();
        csv_content.push_str(&line.join(","));
        csv_content.push('\n');
    }
    csv_content
}
