//! Error types for configuration, authentication and the remote stores.
//!
//! Parse, resolution and conflict outcomes are not errors: they are plan data
//! (see [`crate::planner::Decision`]). Only the variants here ever surface as `Err`.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid or unreadable configuration. Fatal before planning.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in configuration file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid column letter for {field}: {value:?}")]
    InvalidColumn { field: &'static str, value: String },

    #[error("Start row must be 1 or greater, got {0}")]
    InvalidStartRow(u32),

    #[error("Columns {first} and {second} both use column {letter}")]
    DuplicateColumn {
        first: &'static str,
        second: &'static str,
        letter: String,
    },

    #[error("Malformed table {path}: {reason}")]
    MalformedTable { path: PathBuf, reason: String },

    #[error("Backend {0:?} is not available in this build (enable the '{0}' feature)")]
    BackendUnavailable(String),
}

/// Credential acquisition failure. Fatal for live runs only.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token file {0} not found. Authorize the app first.")]
    TokenMissing(PathBuf),

    #[error("Token file {path} is unreadable: {reason}")]
    TokenUnreadable { path: PathBuf, reason: String },

    #[error("Token file {0} holds an empty access token")]
    EmptyToken(PathBuf),

    #[error("Token expired at {0}. Re-authorization needed.")]
    Expired(String),
}

/// Remote file store failure, recorded against a single file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        StoreError {
            message: message.into(),
        }
    }
}

/// Remote tabular store failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TabularError {
    #[error("Read failed: {0}")]
    Read(String),

    #[error("Write failed: {0}")]
    Write(String),
}

/// Gradebook rows violate the strictly-increasing row index invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Gradebook row {current} follows row {previous}; row indices must strictly increase")]
pub struct SnapshotError {
    pub previous: u32,
    pub current: u32,
}

/// Persisted plan problems.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Cannot read saved plan {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Saved plan {path} no longer matches the inputs: {detail}")]
    Drift { path: PathBuf, detail: String },
}

/// Fatal errors that abort a run before (or instead of) any partial work.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Cannot load gradebook: {0}")]
    Gradebook(#[from] TabularError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Cannot list submissions folder {path}: {source}")]
    Folder {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot write {path}: {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}
