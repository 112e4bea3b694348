//! The narrow interfaces to everything outside the matching core.
//!
//! Implementations live in [`crate::local`], [`crate::credentials`] and, with the
//! `google` feature, `crate::google`. Tests supply in-memory fakes.

use crate::cell::{CellRef, RangeSpec};
use crate::config::Visibility;
use crate::error::{AuthError, StoreError, TabularError};
use std::fmt;

/// A bearer credential. The token is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Credential {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Produces a valid credential or explains why it cannot.
pub trait CredentialProvider {
    fn obtain(&self) -> Result<Credential, AuthError>;
}

/// Everything the file store needs to keep one submission.
#[derive(Debug, Clone, Copy)]
pub struct StoreRequest<'a> {
    pub bytes: &'a [u8],
    pub filename: &'a str,
    pub folder_id: &'a str,
    pub mime_type: &'a str,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub content_id: String,
    pub share_url: String,
}

/// Accepts bytes plus metadata and hands back a stable id and a shareable URL.
pub trait FileStore {
    fn store(&self, request: &StoreRequest<'_>) -> Result<StoredFile, StoreError>;
}

/// Reads and writes cells of a named sheet.
pub trait TabularStore {
    /// Rows of `range`, top to bottom. Trailing empty rows and cells may be omitted.
    fn read_range(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        range: &RangeSpec,
    ) -> Result<Vec<Vec<String>>, TabularError>;

    fn write_cell(
        &mut self,
        sheet_id: &str,
        sheet_name: &str,
        cell: CellRef,
        value: &str,
    ) -> Result<(), TabularError>;

    /// Append a row after the last non-empty one. `values[i]` lands in column
    /// `i + 1`. Returns the sheet row number of the new row.
    fn append_row(
        &mut self,
        sheet_id: &str,
        sheet_name: &str,
        values: &[String],
    ) -> Result<u32, TabularError>;
}
