use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::session::file_stem;

/// Persisted thread root of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadState {
    pub thread_ts: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub created_at: String,
}

/// Per-session thread files: `<dir>/<session>.json`
#[derive(Debug, Clone)]
pub struct ThreadStore {
    dir: PathBuf,
}

impl ThreadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ThreadStore { dir: dir.into() }
    }

    fn path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(session_id)))
    }

    /// Thread root for `session_id`. Missing or corrupt state means no thread.
    pub fn load(&self, session_id: &str) -> Option<ThreadState> {
        let content = fs::read_to_string(self.path(session_id)).ok()?;
        serde_json::from_str::<ThreadState>(&content)
            .ok()
            .filter(|state| !state.thread_ts.is_empty())
    }

    pub fn save(&self, session_id: &str, thread_ts: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create thread dir: {}", self.dir.display()))?;

        let state = ThreadState {
            thread_ts: thread_ts.to_string(),
            session_id: session_id.to_string(),
            created_at: crate::timestamp(),
        };
        let path = self.path(session_id);
        fs::write(&path, serde_json::to_string_pretty(&state)?)
            .with_context(|| format!("Failed to save thread state: {}", path.display()))?;
        Ok(())
    }

    /// Forget the thread root of `session_id`; the next post starts a new thread
    pub fn clear(&self, session_id: &str) -> Result<()> {
        let path = self.path(session_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to clear thread state: {}", path.display())),
        }
    }

    /// Delete thread files whose session marker in `sessions_dir` is gone.
    /// Returns the number removed.
    pub fn prune_orphans(&self, sessions_dir: &Path) -> usize {
        let pattern = self.dir.join("*.json");
        let Some(pattern) = pattern.to_str() else {
            return 0;
        };
        let Ok(entries) = glob::glob(pattern) else {
            return 0;
        };

        let mut removed = 0;
        for path in entries.flatten() {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if sessions_dir.join(format!("{stem}.session")).exists() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::debug!(path = %path.display(), "failed to prune thread state: {e}")
                }
            }
        }
        if removed > 0 {
            tracing::debug!(removed, "pruned orphaned thread state");
        }
        removed
    }

    #[cfg(test)]
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_state_is_none() {
        let temp = TempDir::new().unwrap();
        let store = ThreadStore::new(temp.path().join("threads"));
        assert!(store.load("abc").is_none());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = ThreadStore::new(temp.path().join("threads"));
        store.save("abc", "1700000000.000100").unwrap();

        let state = store.load("abc").unwrap();
        assert_eq!(state.thread_ts, "1700000000.000100");
        assert_eq!(state.session_id, "abc");
        assert!(store.dir().join("abc.json").exists());
    }

    #[test]
    fn test_corrupt_or_empty_state_is_none() {
        let temp = TempDir::new().unwrap();
        let store = ThreadStore::new(temp.path());
        fs::write(temp.path().join("bad.json"), "{not json").unwrap();
        fs::write(temp.path().join("empty.json"), r#"{"thread_ts":""}"#).unwrap();

        assert!(store.load("bad").is_none());
        assert!(store.load("empty").is_none());
    }

    #[test]
    fn test_clear() {
        let temp = TempDir::new().unwrap();
        let store = ThreadStore::new(temp.path());
        store.save("abc", "1.5").unwrap();

        store.clear("abc").unwrap();
        assert!(store.load("abc").is_none());
        store.clear("abc").unwrap();
    }

    #[test]
    fn test_prune_orphans_keeps_live_sessions() {
        let temp = TempDir::new().unwrap();
        let sessions = temp.path().join("sessions");
        fs::create_dir_all(&sessions).unwrap();
        fs::write(sessions.join("live.session"), "0").unwrap();

        let store = ThreadStore::new(temp.path().join("threads"));
        store.save("live", "1.1").unwrap();
        store.save("gone", "2.2").unwrap();

        assert_eq!(store.prune_orphans(&sessions), 1);
        assert!(store.load("live").is_some());
        assert!(store.load("gone").is_none());
    }

    #[test]
    fn test_legacy_state_without_metadata() {
        let temp = TempDir::new().unwrap();
        let store = ThreadStore::new(temp.path());
        fs::write(temp.path().join("old.json"), r#"{"thread_ts":"1.5"}"#).unwrap();

        assert_eq!(store.load("old").unwrap().thread_ts, "1.5");
    }
}
