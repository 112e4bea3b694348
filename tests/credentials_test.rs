use chrono::{Duration, Utc};
use std::fs;
use submission_linker::credentials::{LocalCredentials, TokenFileCredentials};
use submission_linker::error::AuthError;
use submission_linker::remote::CredentialProvider;
use tempfile::TempDir;

#[test]
fn test_valid_token_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("token.json");
    let expiry = (Utc::now() + Duration::hours(1)).to_rfc3339();
    fs::write(
        &path,
        format!(r#"{{"token": " ya29.abc ", "expiry": "{}", "refresh_token": "x"}}"#, expiry),
    )
    .unwrap();

    let credential = TokenFileCredentials::new(&path).obtain().unwrap();
    assert_eq!(credential.token(), "ya29.abc");
    // The token never shows up in debug output
    assert!(!format!("{:?}", credential).contains("ya29"));
}

#[test]
fn test_token_file_problems() {
    let dir = TempDir::new().unwrap();

    let missing = dir.path().join("token.json");
    assert!(matches!(
        TokenFileCredentials::new(&missing).obtain(),
        Err(AuthError::TokenMissing(_))
    ));

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "not json").unwrap();
    assert!(matches!(
        TokenFileCredentials::new(&garbage).obtain(),
        Err(AuthError::TokenUnreadable { .. })
    ));

    let empty = dir.path().join("empty.json");
    fs::write(&empty, r#"{"access_token": "  "}"#).unwrap();
    assert!(matches!(
        TokenFileCredentials::new(&empty).obtain(),
        Err(AuthError::EmptyToken(_))
    ));

    let expired = dir.path().join("expired.json");
    fs::write(
        &expired,
        r#"{"access_token": "abc", "expiry": "2020-01-01T00:00:00Z"}"#,
    )
    .unwrap();
    assert!(matches!(
        TokenFileCredentials::new(&expired).obtain(),
        Err(AuthError::Expired(_))
    ));
}

#[test]
fn test_local_credentials_always_succeed() {
    assert!(LocalCredentials.obtain().is_ok());
}
