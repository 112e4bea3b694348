//! Resolve candidate identities to a gradebook row.
//!
//! Resolution is first-match-wins: candidates are tried in the order the parser
//! produced them, each candidate runs through a fixed list of strategies, and each
//! strategy scans rows top to bottom. There is no scoring; when several rows would
//! match equally well the earliest one wins.

use crate::config::Precedence;
use crate::gradebook::{GradebookRow, GradebookSnapshot};
use crate::parser::Identity;
use crate::tables::{GroupMapping, PrecomputedMatches};
use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a file was tied to its row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMethod {
    Precomputed,
    IdExact,
    GroupMapped,
    NameExact,
    NamePartial,
    NameNormalized,
}

impl MatchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMethod::Precomputed => "precomputed",
            MatchMethod::IdExact => "id-exact",
            MatchMethod::GroupMapped => "group-mapped",
            MatchMethod::NameExact => "name-exact",
            MatchMethod::NamePartial => "name-partial",
            MatchMethod::NameNormalized => "name-normalized",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// An existing row.
    Matched {
        row: u32,
        identity: Identity,
        method: MatchMethod,
    },
    /// A known group with no row in the gradebook yet.
    NeedsNewRow { group: String, method: MatchMethod },
    Unresolved,
}

/// Matchers tried for a person-name candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NameStrategy {
    Group,
    Exact,
    Partial,
    Normalized,
}

const GROUP_FIRST: [NameStrategy; 4] = [
    NameStrategy::Group,
    NameStrategy::Exact,
    NameStrategy::Partial,
    NameStrategy::Normalized,
];

const NAME_FIRST: [NameStrategy; 4] = [
    NameStrategy::Exact,
    NameStrategy::Partial,
    NameStrategy::Normalized,
    NameStrategy::Group,
];

/// Resolves candidates against one snapshot and the optional lookup tables.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
    gradebook: &'a GradebookSnapshot,
    groups: Option<&'a GroupMapping>,
    precomputed: Option<&'a PrecomputedMatches>,
    precedence: Precedence,
}

impl<'a> Resolver<'a> {
    pub fn new(gradebook: &'a GradebookSnapshot) -> Self {
        Resolver {
            gradebook,
            groups: None,
            precomputed: None,
            precedence: Precedence::default(),
        }
    }

    pub fn with_groups(mut self, groups: Option<&'a GroupMapping>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_precomputed(mut self, precomputed: Option<&'a PrecomputedMatches>) -> Self {
        self.precomputed = precomputed;
        self
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// Resolve the candidates parsed from `filename`.
    ///
    /// A precomputed entry for `filename` is authoritative and bypasses the
    /// candidates entirely, including when it says the file has no owner.
    pub fn resolve(&self, filename: &str, candidates: &[Identity]) -> Resolution {
        if let Some(entry) = self.precomputed.and_then(|p| p.get(filename)) {
            trace!("{}: using precomputed match {:?}", filename, entry);
            return match &entry.identity {
                Some(identity) => self.resolve_precomputed(identity, entry.label.as_deref()),
                None => Resolution::Unresolved,
            };
        }

        candidates
            .iter()
            .find_map(|candidate| self.resolve_candidate(candidate))
            .unwrap_or(Resolution::Unresolved)
    }

    fn resolve_candidate(&self, candidate: &Identity) -> Option<Resolution> {
        match candidate {
            Identity::StudentId(id) => self.by_id(id),
            Identity::GroupName(group) => Some(self.group_row(group)),
            Identity::PersonName { first, last } => {
                let strategies = match self.precedence {
                    Precedence::GroupFirst => GROUP_FIRST,
                    Precedence::NameFirst => NAME_FIRST,
                };
                strategies
                    .iter()
                    .find_map(|strategy| self.by_name(*strategy, first, last))
            }
        }
    }

    /// A label of `group-mapped` marks the identity as a group even when no
    /// group mapping is loaded.
    fn resolve_precomputed(&self, identity: &str, label: Option<&str>) -> Resolution {
        let labelled_group =
            label.is_some_and(|l| l.eq_ignore_ascii_case(MatchMethod::GroupMapped.as_str()));
        let is_group = labelled_group || self.groups.is_some_and(|g| g.contains_group(identity));
        if let Some(row) = self.gradebook.find_by_id(identity) {
            let identity = if is_group {
                Identity::GroupName(row.id.trim().to_string())
            } else {
                Identity::StudentId(row.id.trim().to_string())
            };
            return Resolution::Matched {
                row: row.index,
                identity,
                method: MatchMethod::Precomputed,
            };
        }

        let wanted = fold_name(identity);
        if let Some(row) =
            named_rows(self.gradebook).find(|row| fold_name(&row.full_name()) == wanted)
        {
            return Resolution::Matched {
                row: row.index,
                identity: Identity::person(&row.first_name, &row.last_name),
                method: MatchMethod::Precomputed,
            };
        }

        if is_group {
            return Resolution::NeedsNewRow {
                group: identity.trim().to_string(),
                method: MatchMethod::Precomputed,
            };
        }
        Resolution::Unresolved
    }

    fn by_id(&self, id: &str) -> Option<Resolution> {
        self.gradebook
            .find_by_id(id)
            .map(|row| Resolution::Matched {
                row: row.index,
                identity: Identity::StudentId(id.trim().to_string()),
                method: MatchMethod::IdExact,
            })
    }

    fn group_row(&self, group: &str) -> Resolution {
        match self.gradebook.find_by_id(group) {
            Some(row) => Resolution::Matched {
                row: row.index,
                identity: Identity::GroupName(group.trim().to_string()),
                method: MatchMethod::GroupMapped,
            },
            None => Resolution::NeedsNewRow {
                group: group.trim().to_string(),
                method: MatchMethod::GroupMapped,
            },
        }
    }

    fn by_name(&self, strategy: NameStrategy, first: &str, last: &str) -> Option<Resolution> {
        match strategy {
            NameStrategy::Group => self.by_group(first, last),
            NameStrategy::Exact => self.by_exact_name(first, last),
            NameStrategy::Partial => self.by_partial_name(first, last),
            NameStrategy::Normalized => self.by_normalized_name(first, last),
        }
    }

    fn by_group(&self, first: &str, last: &str) -> Option<Resolution> {
        let group = self.groups?.lookup(first, last)?;
        Some(self.group_row(group))
    }

    fn by_exact_name(&self, first: &str, last: &str) -> Option<Resolution> {
        let (first, last) = (lower(first), lower(last));
        self.find_name(MatchMethod::NameExact, |row| {
            lower(&row.first_name) == first && lower(&row.last_name) == last
        })
    }

    fn by_partial_name(&self, first: &str, last: &str) -> Option<Resolution> {
        let (first, last) = (lower(first), lower(last));
        if last.is_empty() {
            return None;
        }
        self.find_name(MatchMethod::NamePartial, |row| {
            lower(&row.first_name) == first && lower(&row.last_name).starts_with(&last)
        })
    }

    fn by_normalized_name(&self, first: &str, last: &str) -> Option<Resolution> {
        let wanted = fold_name(&format!("{} {}", first, last));
        if wanted.is_empty() {
            return None;
        }
        self.find_name(MatchMethod::NameNormalized, |row| {
            fold_name(&row.full_name()) == wanted
        })
    }

    fn find_name(
        &self,
        method: MatchMethod,
        matches: impl Fn(&GradebookRow) -> bool,
    ) -> Option<Resolution> {
        named_rows(self.gradebook)
            .find(|row| matches(row))
            .map(|row| Resolution::Matched {
                row: row.index,
                identity: Identity::person(&row.first_name, &row.last_name),
                method,
            })
    }
}

/// Rows that carry both a first and a last name.
fn named_rows(gradebook: &GradebookSnapshot) -> impl Iterator<Item = &GradebookRow> {
    gradebook
        .rows()
        .iter()
        .filter(|row| !row.first_name.trim().is_empty() && !row.last_name.trim().is_empty())
}

/// Lowercase, hyphens and underscores to spaces, runs of whitespace collapsed.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// [`normalize_name`] with the spaces removed, so `Mary-Ann`, `Mary Ann` and
/// `maryann` all compare equal.
pub fn fold_name(name: &str) -> String {
    normalize_name(name).replace(' ', "")
}

fn lower(s: &str) -> String {
    s.trim().to_lowercase()
}
