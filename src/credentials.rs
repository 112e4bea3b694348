use crate::error::AuthError;
use crate::remote::{Credential, CredentialProvider};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// The parts of an authorized-user token file this tool cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenFile {
    #[serde(alias = "token")]
    pub access_token: String,

    /// RFC 3339 expiry, if the file records one.
    #[serde(default)]
    pub expiry: Option<String>,
}

/// Reads a previously authorized token from disk.
///
/// Obtaining or refreshing the token is left to whatever wrote the file.
#[derive(Debug, Clone)]
pub struct TokenFileCredentials {
    path: PathBuf,
}

impl TokenFileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TokenFileCredentials { path: path.into() }
    }

    fn read(&self) -> Result<TokenFile, AuthError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::TokenMissing(self.path.clone()));
            }
            Err(e) => {
                return Err(AuthError::TokenUnreadable {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        };
        serde_json::from_str(&contents).map_err(|e| AuthError::TokenUnreadable {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

impl CredentialProvider for TokenFileCredentials {
    fn obtain(&self) -> Result<Credential, AuthError> {
        let token = self.read()?;
        if token.access_token.trim().is_empty() {
            return Err(AuthError::EmptyToken(self.path.clone()));
        }
        if let Some(expiry) = &token.expiry {
            let expires_at = DateTime::parse_from_rfc3339(expiry).map_err(|e| {
                AuthError::TokenUnreadable {
                    path: self.path.clone(),
                    reason: format!("bad expiry {:?}: {}", expiry, e),
                }
            })?;
            if expires_at.with_timezone(&Utc) <= Utc::now() {
                return Err(AuthError::Expired(expiry.clone()));
            }
        }
        debug!("Token loaded from {}", self.path.display());
        Ok(Credential::bearer(token.access_token.trim()))
    }
}

/// For the local stores, which need no authorization.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCredentials;

impl CredentialProvider for LocalCredentials {
    fn obtain(&self) -> Result<Credential, AuthError> {
        Ok(Credential::bearer("local"))
    }
}
