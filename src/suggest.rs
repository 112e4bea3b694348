//! "Did you mean" hints for files the resolver could not place.
//!
//! Suggestions are advisory: they show up in reports and in exported match
//! tables, and never change a decision.

use crate::gradebook::GradebookSnapshot;
use crate::parser::{Identity, file_stem};
use crate::resolver::normalize_name;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref NOISE_REGEX: Regex =
        Regex::new(r"(?i)assignsubmission_file_|\b(a\d+|assignment\s*\d*|project|submission)\b")
            .unwrap();
}

/// Scores below this produce no suggestion.
pub const MIN_SCORE: f64 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quality {
    Exact,
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Quality {
    pub fn from_score(score: f64) -> Option<Self> {
        match score {
            s if s >= 1.0 => Some(Quality::Exact),
            s if s >= 0.8 => Some(Quality::Excellent),
            s if s >= 0.7 => Some(Quality::Good),
            s if s >= 0.5 => Some(Quality::Fair),
            s if s >= MIN_SCORE => Some(Quality::Poor),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Exact => "EXACT",
            Quality::Excellent => "EXCELLENT",
            Quality::Good => "GOOD",
            Quality::Fair => "FAIR",
            Quality::Poor => "POOR",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Suggestion {
    pub row: u32,
    /// The gradebook text that scored best: an id or "First Last".
    pub label: String,
    pub score: f64,
    pub quality: Quality,
}

/// The gradebook entry most similar to anything extracted from `filename`.
/// Ties go to the earliest row.
pub fn closest(
    filename: &str,
    candidates: &[Identity],
    gradebook: &GradebookSnapshot,
) -> Option<Suggestion> {
    let mut probes: Vec<String> = candidates
        .iter()
        .map(|c| normalize_name(&c.to_string()))
        .collect();
    let stem = NOISE_REGEX.replace_all(file_stem(filename), " ");
    probes.push(normalize_name(&stem));
    probes.retain(|p| !p.is_empty());

    let mut best: Option<Suggestion> = None;
    for row in gradebook.rows() {
        let targets = [row.id.trim().to_string(), row.full_name()];
        for target in targets.iter().filter(|t| !t.is_empty()) {
            let normalized = normalize_name(target);
            for probe in &probes {
                let score = similarity(probe, &normalized);
                if best.as_ref().is_none_or(|b| score > b.score) {
                    if let Some(quality) = Quality::from_score(score) {
                        best = Some(Suggestion {
                            row: row.index,
                            label: target.clone(),
                            score,
                            quality,
                        });
                    }
                }
            }
        }
    }
    best
}

/// 1.0 for identical strings, falling towards 0.0 with edit distance.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let longest = a.chars().count().max(b.chars().count());
    1.0 - levenshtein_distance(a, b) as f64 / longest as f64
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];
    for (i, ca) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b_chars.len()]
}
