//! File store: filesystem access rooted at the working tree.
//!
//! Reads and writes never propagate I/O errors: a failed read is an empty
//! string, a failed write is `false`. Callers turn those into result text.
//!
//! Every path is confined to the root. A path that climbs out with `..`, an
//! absolute path elsewhere on disk, or a symlink pointing outside the tree is
//! treated as if it did not exist.

use chrono::{DateTime, Utc};
use codeclaw_core::error::ToolError;
use codeclaw_core::normalize_path;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directories never descended into when walking the tree.
const IGNORED_DIRS: &[&str] = &["__pycache__", "node_modules", "venv", "target"];

/// File extensions skipped by tree walks.
const IGNORED_EXTENSIONS: &[&str] = &["pyc", "log"];

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

/// Visible entries of one directory, each list sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    pub path: PathBuf,
    pub folders: Vec<String>,
    pub files: Vec<String>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map `path` onto the working tree.
    ///
    /// Relative paths are joined onto the root; absolute paths must already
    /// lie under it. The result is rejected if it lands outside the root,
    /// either lexically or once existing symlinks are followed.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let candidate = Path::new(path);
        let full = if candidate.is_absolute() {
            lexical_clean(candidate)
        } else {
            lexical_clean(&self.root.join(candidate))
        };
        let root = lexical_clean(&self.root);

        let inside = match (real_path(&full), fs::canonicalize(&root)) {
            (Some(real), Ok(real_root)) => real.starts_with(real_root),
            _ => full.starts_with(&root),
        };
        if inside {
            Ok(full)
        } else {
            warn!(path = %path, root = %self.root.display(), "Path outside the working tree");
            Err(ToolError::InvalidArguments(format!("path '{path}' is outside the working tree")))
        }
    }

    /// Read a file as UTF-8 text, or an empty string if that fails.
    pub fn read(&self, path: &str) -> String {
        let Ok(full) = self.resolve(path) else {
            return String::new();
        };
        match fs::read_to_string(full) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path, error = %e, "Read failed");
                String::new()
            }
        }
    }

    /// Write a file, creating parent directories as needed.
    pub fn write(&self, path: &str, content: &str) -> bool {
        let Ok(full) = self.resolve(path) else {
            return false;
        };
        if let Some(parent) = full.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warn!(path = %path, error = %e, "Cannot create parent directories");
            return false;
        }
        match fs::write(&full, content) {
            Ok(()) => {
                debug!(path = %path, bytes = content.len(), "File written");
                true
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Write failed");
                false
            }
        }
    }

    pub fn delete(&self, path: &str) -> bool {
        let Ok(full) = self.resolve(path) else {
            return false;
        };
        match fs::remove_file(full) {
            Ok(()) => true,
            Err(e) => {
                debug!(path = %path, error = %e, "Delete failed");
                false
            }
        }
    }

    /// Whether `path` names an existing regular file.
    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|full| full.is_file())
    }

    /// Whether `path` names an existing directory.
    pub fn is_dir(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|full| full.is_dir())
    }

    pub fn modified(&self, path: &str) -> Option<DateTime<Utc>> {
        fs::metadata(self.resolve(path).ok()?)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from)
    }

    /// List a directory's visible folders and files.
    pub fn list_dir(&self, directory: &str) -> Option<DirListing> {
        let full = self.resolve(directory).ok()?;
        let entries = fs::read_dir(&full).ok()?;

        let mut listing = DirListing {
            path: fs::canonicalize(&full).unwrap_or(full),
            ..DirListing::default()
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => listing.folders.push(name),
                Ok(kind) if kind.is_file() => listing.files.push(name),
                _ => {}
            }
        }
        listing.folders.sort();
        listing.files.sort();
        Some(listing)
    }

    /// Every visible file under the root, as root-relative normalized paths.
    ///
    /// Entries are visited in file-name order so the result is deterministic.
    pub fn walk_files(&self, max_depth: usize) -> Vec<String> {
        walk(&self.root, &self.root, max_depth)
    }

    /// Every visible file under `directory`, still relative to the root.
    /// `max_depth` counts from `directory`.
    pub fn walk_dir(&self, directory: &str, max_depth: usize) -> Vec<String> {
        match self.resolve(directory) {
            Ok(base) => walk(&base, &lexical_clean(&self.root), max_depth),
            Err(_) => Vec::new(),
        }
    }
}

fn walk(base: &Path, root: &Path, max_depth: usize) -> Vec<String> {
    WalkDir::new(base)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_ignored(entry.path(), entry.file_type().is_dir()))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|rel| normalize_path(&rel.to_string_lossy()))
        })
        .collect()
}

/// Collapse `.` and `..` without touching the filesystem. `..` never climbs
/// above a filesystem root.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir if out.as_os_str().is_empty() => out.push("."),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                Some(Component::CurDir) => out = PathBuf::from(".."),
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor of `path` and re-attach the
/// rest, so paths that do not exist yet can still be checked.
fn real_path(path: &Path) -> Option<PathBuf> {
    path.ancestors().find_map(|ancestor| {
        let real = fs::canonicalize(ancestor).ok()?;
        let rest = path.strip_prefix(ancestor).ok()?;
        Some(real.join(rest))
    })
}

fn is_ignored(path: &Path, is_dir: bool) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    if name.starts_with('.') {
        return true;
    }
    if is_dir {
        return IGNORED_DIRS.contains(&&*name);
    }
    path.extension()
        .map(|ext| IGNORED_EXTENSIONS.contains(&&*ext.to_string_lossy()))
        .unwrap_or(false)
}
