//! Advisory client-side preference cache.
//!
//! Values cached here are never authoritative: the session catalog always
//! reconciles against the server on load, so a provider may lose writes
//! without corrupting anything. That is why `save` swallows I/O failures
//! instead of propagating them.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const PREF_USER_ID: &str = "user_id";
pub const PREF_SESSION_ID: &str = "session_id";
pub const PREF_BASE_URL: &str = "base_url";

pub const PREFS_DIR: &str = ".chat_console";
pub const PREFS_FILE: &str = "prefs.json";

/// Minimal capability interface over persisted client-side state.
pub trait PrefsStore {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, value: &str);
}

/// JSON-file-backed provider. A missing or unreadable file starts empty.
#[derive(Debug)]
pub struct FilePrefs {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FilePrefs {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = read_values(&path).unwrap_or_default();
        Self { path, values }
    }

    /// Conventional location under a working directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self::open(dir.join(PREFS_DIR).join(PREFS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_out(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(&self.values).map_err(io::Error::other)?;
        fs::write(&self.path, body)
    }
}

impl PrefsStore for FilePrefs {
    fn load(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
        if let Err(error) = self.write_out() {
            tracing::warn!(%error, path = %self.path.display(), "preference write lost");
        }
    }
}

fn read_values(path: &Path) -> Option<BTreeMap<String, String>> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(values) => Some(values),
        Err(error) => {
            tracing::warn!(%error, path = %path.display(), "ignoring unreadable preference cache");
            None
        }
    }
}

/// In-memory provider for tests and headless embedding.
#[derive(Debug, Default)]
pub struct MemoryPrefs {
    values: BTreeMap<String, String>,
}

impl PrefsStore for MemoryPrefs {
    fn load(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::{FilePrefs, MemoryPrefs, PrefsStore, PREF_SESSION_ID, PREF_USER_ID};

    #[test]
    fn file_prefs_round_trip_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir should create");

        {
            let mut prefs = FilePrefs::in_dir(dir.path());
            prefs.save(PREF_USER_ID, "u-1");
            prefs.save(PREF_SESSION_ID, "s-9");
        }

        let reopened = FilePrefs::in_dir(dir.path());
        assert_eq!(reopened.load(PREF_USER_ID).as_deref(), Some("u-1"));
        assert_eq!(reopened.load(PREF_SESSION_ID).as_deref(), Some("s-9"));
        assert_eq!(reopened.load("unknown"), None);
    }

    #[test]
    fn corrupt_cache_file_starts_empty_instead_of_failing() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").expect("fixture write should succeed");

        let prefs = FilePrefs::open(&path);
        assert_eq!(prefs.load(PREF_USER_ID), None);
    }

    #[test]
    fn save_overwrites_previous_value() {
        let mut prefs = MemoryPrefs::default();
        prefs.save(PREF_SESSION_ID, "a");
        prefs.save(PREF_SESSION_ID, "b");

        assert_eq!(prefs.load(PREF_SESSION_ID).as_deref(), Some("b"));
    }
}
