use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// A session marker older than this starts a new session
pub const SESSION_IDLE_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);
/// Markers older than this are deleted when a new session starts
pub const SESSION_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Reduce a session id to a safe file stem (no separators, no dot-dot)
pub fn file_stem(session_id: &str) -> String {
    let stem: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "unknown".to_string()
    } else {
        stem
    }
}

/// Tracks whether an event is the first one of a session via a marker file
/// `<dir>/<session>.session` whose mtime is refreshed on every event.
#[derive(Debug)]
pub struct SessionTracker {
    session_id: String,
    is_new_session: bool,
}

impl SessionTracker {
    /// Check and refresh the marker for `session_id`.
    pub fn open(session_dir: &Path, session_id: &str) -> Result<Self> {
        fs::create_dir_all(session_dir).with_context(|| {
            format!("Failed to create session dir: {}", session_dir.display())
        })?;

        let session_file = marker_path(session_dir, session_id);
        let is_new_session = match marker_age(&session_file) {
            Some(age) => age > SESSION_IDLE_LIMIT,
            None => true,
        };

        // Marker content is the creation time; mtime is the last activity
        if is_new_session {
            let now = chrono::Utc::now().timestamp().to_string();
            fs::write(&session_file, now).with_context(|| {
                format!("Failed to write session marker: {}", session_file.display())
            })?;
            prune_stale_sessions(session_dir, SESSION_RETENTION);
        } else {
            touch(&session_file)?;
        }

        Ok(SessionTracker {
            session_id: session_id.to_string(),
            is_new_session,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_new_session(&self) -> bool {
        self.is_new_session
    }
}

fn marker_path(session_dir: &Path, session_id: &str) -> PathBuf {
    session_dir.join(format!("{}.session", file_stem(session_id)))
}

fn marker_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    )
}

fn touch(path: &Path) -> Result<()> {
    let file = fs::OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open session marker: {}", path.display()))?;
    file.set_modified(SystemTime::now())
        .with_context(|| format!("Failed to touch session marker: {}", path.display()))?;
    Ok(())
}

/// Delete `*.session` markers idle for longer than `retention`.
/// Returns the number removed.
pub fn prune_stale_sessions(session_dir: &Path, retention: Duration) -> usize {
    let pattern = session_dir.join("*.session");
    let Some(pattern) = pattern.to_str() else {
        return 0;
    };
    let Ok(entries) = glob::glob(pattern) else {
        return 0;
    };

    let mut removed = 0;
    for path in entries.flatten() {
        if marker_age(&path).is_some_and(|age| age > retention) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::debug!(path = %path.display(), "failed to prune session marker: {e}")
                }
            }
        }
    }
    if removed > 0 {
        tracing::debug!(removed, "pruned stale session markers");
    }
    removed
}
