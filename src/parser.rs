//! Candidate identities from raw submission filenames.
//!
//! Three conventions are recognised, tried in this order:
//!
//! 1. Moodle bulk export: `First Last_<submission>_assignsubmission_file_<student id>_<rest>`
//!    gives the student id, then the person name as a fallback.
//! 2. Legacy numeric: six or more leading digits followed by `_`, `.` or whitespace.
//! 3. Bare name, only when neither pattern matched: the first two word-like tokens
//!    of the stem, with underscores and digit runs acting as separators.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref MOODLE_REGEX: Regex = Regex::new(
        r"(?i)^\s*([^_]+?)\s*_\s*(\d+)\s*_assignsubmission_file_\s*(\d+)\s*(?:[_.\s]|$)"
    )
    .unwrap();
    static ref LEGACY_REGEX: Regex = Regex::new(r"^\s*(\d{6,})(?:[_.\s]|$)").unwrap();
    static ref SEPARATOR_REGEX: Regex = Regex::new(r"[_\d]+").unwrap();
}

/// Who a file (or a gradebook row) belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    StudentId(String),
    PersonName { first: String, last: String },
    GroupName(String),
}

impl Identity {
    pub fn person(first: &str, last: &str) -> Self {
        Identity::PersonName {
            first: first.trim().to_string(),
            last: last.trim().to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Identity::StudentId(_) => "student-id",
            Identity::PersonName { .. } => "name",
            Identity::GroupName(_) => "group",
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::StudentId(id) => f.write_str(id),
            Identity::PersonName { first, last } => write!(f, "{} {}", first, last),
            Identity::GroupName(name) => f.write_str(name),
        }
    }
}

/// Parse `filename` into candidates, most confident first. An empty result means
/// nothing usable could be extracted.
pub fn parse(filename: &str) -> Vec<Identity> {
    let mut candidates = Vec::new();

    let moodle = moodle_candidates(filename);
    let matched_moodle = !moodle.is_empty();
    candidates.extend(moodle);

    let legacy = legacy_candidate(filename);
    let matched_legacy = legacy.is_some();
    candidates.extend(legacy);

    if !matched_moodle && !matched_legacy {
        candidates.extend(bare_name_candidate(filename));
    }
    candidates
}

fn moodle_candidates(filename: &str) -> Vec<Identity> {
    let Some(caps) = MOODLE_REGEX.captures(filename) else {
        return Vec::new();
    };
    let mut candidates = vec![Identity::StudentId(caps[3].trim().to_string())];

    let mut words = caps[1].split_whitespace();
    if let Some(first) = words.next() {
        let last = words.collect::<Vec<_>>().join(" ");
        if !last.is_empty() {
            candidates.push(Identity::person(first, &last));
        }
    }
    candidates
}

fn legacy_candidate(filename: &str) -> Option<Identity> {
    LEGACY_REGEX
        .captures(filename)
        .map(|caps| Identity::StudentId(caps[1].to_string()))
}

fn bare_name_candidate(filename: &str) -> Option<Identity> {
    let stem = file_stem(filename);
    let mut words = SEPARATOR_REGEX
        .split(stem)
        .flat_map(str::split_whitespace)
        .filter(|token| is_word_like(token));
    let first = words.next()?;
    let second = words.next()?;
    Some(Identity::person(first, second))
}

/// Filename without its extension. Dots inside the stem are kept.
pub fn file_stem(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, ext))
            if !stem.trim().is_empty()
                && !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            stem
        }
        _ => filename,
    }
}

fn is_word_like(token: &str) -> bool {
    let mut chars = token.chars();
    let Some(head) = chars.next() else {
        return false;
    };
    head.is_alphabetic()
        && token.chars().count() >= 2
        && chars.all(|c| c.is_alphabetic() || c == '-' || c == '\'')
}
