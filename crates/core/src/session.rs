//! Session state: the working set of tracked files plus request history.
//!
//! [`SessionState`] is a plain owned value: the caller holds the only
//! mutable reference and passes it into each turn. [`SessionStore`] is the
//! persistence collaborator that reads it once at startup and rewrites it
//! after every turn.
//!
//! On disk the session is a JSON object with two fields:
//!
//! ```json
//! { "files": ["src/main.py", "README.md"], "history": ["find python files"] }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::SessionError;

/// Normalize a path for identity comparison.
///
/// Backslashes become slashes, leading `./` segments and duplicate or
/// trailing slashes are dropped. No filesystem access.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    while normalized.contains("//") {
        normalized = normalized.replace("//", "/");
    }
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// A file in the assistant's working context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    /// Normalized path, unique within a session
    pub path: String,

    /// Last observed modification time, if the file has been stat'ed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl TrackedFile {
    pub fn new(path: &str) -> Self {
        Self {
            path: normalize_path(path),
            modified: None,
        }
    }

    pub fn with_modified(mut self, modified: Option<DateTime<Utc>>) -> Self {
        self.modified = modified;
        self
    }

    /// The final path component, or the whole path if there is none.
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// The persisted shape of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub files: Vec<String>,

    #[serde(default)]
    pub history: Vec<String>,
}

/// Tracked files (insertion order) and capped request history.
#[derive(Debug, Clone)]
pub struct SessionState {
    files: Vec<TrackedFile>,
    history: Vec<String>,
    max_history: usize,
}

impl SessionState {
    pub fn new(max_history: usize) -> Self {
        Self {
            files: Vec::new(),
            history: Vec::new(),
            max_history: max_history.max(1),
        }
    }

    /// Rebuild state from a persisted record, dropping duplicate paths and
    /// history beyond the cap.
    pub fn from_record(record: SessionRecord, max_history: usize) -> Self {
        let mut state = Self::new(max_history);
        for path in &record.files {
            state.track(TrackedFile::new(path));
        }
        for entry in record.history {
            state.push_history(entry);
        }
        state
    }

    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            files: self.paths(),
            history: self.history.clone(),
        }
    }

    pub fn files(&self) -> &[TrackedFile] {
        &self.files
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Tracked paths in insertion order.
    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    pub fn is_tracked(&self, path: &str) -> bool {
        let wanted = normalize_path(path);
        self.files.iter().any(|f| f.path == wanted)
    }

    /// Track a file. Returns `false` (and changes nothing) if it is already tracked.
    pub fn track(&mut self, file: TrackedFile) -> bool {
        if file.path.is_empty() || self.files.iter().any(|f| f.path == file.path) {
            return false;
        }
        debug!(path = %file.path, "Tracking file");
        self.files.push(file);
        true
    }

    /// Convenience wrapper over [`SessionState::track`] for a bare path.
    pub fn track_path(&mut self, path: &str) -> bool {
        self.track(TrackedFile::new(path))
    }

    /// Update the observed modification time of a tracked file.
    pub fn observe(&mut self, path: &str, modified: Option<DateTime<Utc>>) {
        let wanted = normalize_path(path);
        if let Some(file) = self.files.iter_mut().find(|f| f.path == wanted) {
            file.modified = modified;
        }
    }

    /// Stop tracking a file. Returns whether it was tracked.
    pub fn untrack(&mut self, path: &str) -> bool {
        let wanted = normalize_path(path);
        let before = self.files.len();
        self.files.retain(|f| f.path != wanted);
        self.files.len() < before
    }

    /// Stop tracking everything. Returns how many files were cleared.
    pub fn clear_files(&mut self) -> usize {
        let count = self.files.len();
        self.files.clear();
        count
    }

    /// Append a history entry, dropping the oldest entries beyond the cap.
    pub fn push_history(&mut self, entry: impl Into<String>) {
        self.history.push(entry.into());
        if self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(..excess);
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Reads and writes the session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record. A missing file is an empty record; unreadable or
    /// malformed content is an error.
    ///
    /// Fields with the wrong type (e.g. `"files": null`) are treated as empty
    /// and non-string list items are skipped.
    pub fn load(&self) -> Result<SessionRecord, SessionError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SessionRecord::default()),
            Err(e) => {
                return Err(SessionError::Read {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| SessionError::Malformed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        if !value.is_object() {
            return Err(SessionError::Malformed {
                path: self.path.clone(),
                reason: "expected a JSON object".into(),
            });
        }

        Ok(SessionRecord {
            files: string_list(&value["files"]),
            history: string_list(&value["history"]),
        })
    }

    /// Load the session, replacing any error with empty state.
    pub fn load_state(&self, max_history: usize) -> SessionState {
        match self.load() {
            Ok(record) => {
                debug!(
                    path = %self.path.display(),
                    files = record.files.len(),
                    history = record.history.len(),
                    "Session loaded"
                );
                SessionState::from_record(record, max_history)
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unusable session file");
                SessionState::new(max_history)
            }
        }
    }

    /// Write the record atomically (temp file + rename).
    pub fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        let write_err = |reason: String| SessionError::Write {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(record).map_err(|e| write_err(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| write_err(e.to_string()))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(write_err(e.to_string()));
        }
        Ok(())
    }

    /// Save the session, logging and swallowing any failure.
    pub fn save_state(&self, state: &SessionState) -> bool {
        match self.save(&state.to_record()) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Session save failed");
                false
            }
        }
    }
}

fn string_list(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}
