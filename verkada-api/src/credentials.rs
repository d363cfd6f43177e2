//! Cached API token persistence.
//!
//! Verkada API tokens live for 30 minutes and cannot be refreshed, so the last
//! issued token is kept on disk together with its issue time and reused until
//! it is close to expiry.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::VerkadaError;

/// An API token and the epoch second it was issued at.
///
/// Persisted as `{"token": "...", "timestamp": 1700000000}`. Replaced wholesale
/// on refresh, never mutated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    token: String,
    #[serde(rename = "timestamp")]
    issued_at: i64,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>, issued_at: i64) -> Self {
        Self {
            token: token.into(),
            issued_at,
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    /// See [`is_expired`].
    #[must_use]
    pub fn is_expired(&self, now: i64, window_secs: i64) -> bool {
        is_expired(self, now, window_secs)
    }
}

/// A credential is valid only while `now - issued_at < window_secs`.
#[must_use]
pub fn is_expired(credential: &Credential, now: i64, window_secs: i64) -> bool {
    now.saturating_sub(credential.issued_at) >= window_secs
}

/// Current wall-clock time in epoch seconds.
#[must_use]
pub fn now_epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Single-record token cache on the local filesystem.
///
/// No locking is done: one process instance is expected to own the file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored credential.
    ///
    /// Never fails: a missing, unreadable, torn or otherwise malformed record
    /// is reported as `None`.
    #[must_use]
    pub fn load(&self) -> Option<Credential> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("No cached credential at {}: {e}", self.path.display());
                return None;
            }
        };

        match serde_json::from_str::<Credential>(&contents) {
            Ok(credential) if !credential.token.trim().is_empty() => Some(credential),
            Ok(_) => {
                warn!("Ignoring cached credential with empty token at {}", self.path.display());
                None
            }
            Err(e) => {
                warn!("Ignoring malformed credential file {}: {e}", self.path.display());
                None
            }
        }
    }

    /// Persist `credential`, replacing any previous record.
    ///
    /// The record is written to a sibling temporary file, flushed to disk and
    /// renamed over the destination, so readers only ever see the previous or
    /// the new record.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory, temporary file or rename fails, and
    /// `Serialization` if the record cannot be encoded.
    pub fn save(&self, credential: &Credential) -> Result<(), VerkadaError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec(credential)?;
        let temp_path = self.temp_path();

        let written = write_synced(&temp_path, &data).and_then(|()| fs::rename(&temp_path, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(VerkadaError::Io(e));
        }

        debug!("Cached credential written to {}", self.path.display());
        Ok(())
    }

    /// Remove the stored record if present.
    ///
    /// # Errors
    ///
    /// Returns `Io` for failures other than the file not existing.
    pub fn clear(&self) -> Result<(), VerkadaError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VerkadaError::Io(e)),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "credential".to_string());
        self.path.with_file_name(format!("{file_name}.tmp"))
    }
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    const WINDOW: i64 = 25 * 60;

    fn store_in(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("token.json"))
    }

    #[test]
    fn test_expiry_boundaries() {
        let now = 1_700_000_000;
        assert!(Credential::new("t", now - 26 * 60).is_expired(now, WINDOW));
        assert!(!Credential::new("t", now - 24 * 60).is_expired(now, WINDOW));
        assert!(Credential::new("t", now - WINDOW).is_expired(now, WINDOW));
        assert!(!Credential::new("t", now - WINDOW + 1).is_expired(now, WINDOW));
    }

    #[test]
    fn test_future_issue_time_is_not_expired() {
        let now = 1_700_000_000;
        assert!(!is_expired(&Credential::new("t", now + 60), now, WINDOW));
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let credential = Credential::new("abc.def.ghi", 1_700_000_123);

        store.save(&credential).unwrap();
        assert_eq!(store.load(), Some(credential));
    }

    #[test]
    fn test_persisted_format() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&Credential::new("tok", 42)).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"token": "tok", "timestamp": 42}));
    }

    #[test]
    fn test_save_overwrites_wholesale_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&Credential::new("first", 1)).unwrap();
        store.save(&Credential::new("second", 2)).unwrap();

        assert_eq!(store.load(), Some(Credential::new("second", 2)));
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_failed_save_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("token.json");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        let store = CredentialStore::new(&target);
        assert!(matches!(store.save(&Credential::new("tok", 1)), Err(VerkadaError::Io(_))));
        assert!(!dir.path().join("token.json.tmp").exists());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("nested/cache/token.json"));
        store.save(&Credential::new("tok", 7)).unwrap();
        assert!(store.load().is_some());
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store_in(&dir).load(), None);
    }

    #[test]
    fn test_corrupted_records_load_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for contents in [
            "",
            "{\"token\": \"abc\", \"timest",
            "not json at all",
            "{\"token\": \"abc\"}",
            "{\"token\": \"\", \"timestamp\": 1}",
            "{\"token\": 5, \"timestamp\": 1}",
        ] {
            fs::write(store.path(), contents).unwrap();
            assert_eq!(store.load(), None, "contents: {contents:?}");
        }
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&Credential::new("tok", 1)).unwrap();

        store.clear().unwrap();
        assert_eq!(store.load(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", Credential::new("very-secret", 1));
        assert!(!debug.contains("very-secret"));
    }

    proptest! {
        #[test]
        fn proptest_expiry_matches_window(issued_at in 0i64..2_000_000_000, age in 0i64..10_000) {
            let credential = Credential::new("t", issued_at);
            let now = issued_at + age;
            prop_assert_eq!(credential.is_expired(now, WINDOW), age >= WINDOW);
        }
    }
}
