use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One line of the error journal
#[derive(Debug, Serialize)]
struct ErrorEntry<'a> {
    timestamp: String,
    error_type: &'a str,
    error_message: &'a str,
    context: &'a Value,
}

/// Append-only JSON-lines journal of handler failures.
///
/// Writing is best effort: if the journal itself cannot be written the failure
/// goes to tracing and is otherwise dropped.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ErrorLog { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, error_type: &str, error_message: &str, context: Value) {
        if let Err(e) = self.try_record(error_type, error_message, &context) {
            tracing::error!(
                path = %self.path.display(),
                "failed to write error log entry: {e:#}"
            );
        }
    }

    fn try_record(&self, error_type: &str, error_message: &str, context: &Value) -> Result<()> {
        let entry = ErrorEntry {
            timestamp: crate::timestamp(),
            error_type,
            error_message,
            context,
        };
        append_json_line(&self.path, &entry)
    }
}

/// Serialize `value` and append it as one line with a single write
pub fn append_json_line(path: &Path, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut line = serde_json::to_string(value)?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("Failed to append to {}", path.display()))?;
    Ok(())
}
