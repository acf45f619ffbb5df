//! Best-effort path resolution for loosely specified file names.
//!
//! Strategies run in a fixed order and the first hit wins:
//! 1. the path exactly as given
//! 2. a tracked file with the same basename
//! 3. a bounded walk of the working tree, visited in file-name order

use codeclaw_core::{TrackedFile, normalize_path};
use tracing::debug;

use crate::file_store::FileStore;

pub fn resolve_path(
    store: &FileStore,
    requested: &str,
    tracked: &[TrackedFile],
    max_depth: usize,
) -> Option<String> {
    let requested = normalize_path(requested);
    if requested.is_empty() {
        return None;
    }
    if store.exists(&requested) {
        return Some(requested);
    }

    let wanted = requested.rsplit('/').next().unwrap_or(&requested);

    if let Some(file) = tracked
        .iter()
        .find(|f| f.basename() == wanted && store.exists(&f.path))
    {
        debug!(requested = %requested, resolved = %file.path, "Resolved via tracked file");
        return Some(file.path.clone());
    }

    let found = store
        .walk_files(max_depth)
        .into_iter()
        .find(|path| path.rsplit('/').next().is_some_and(|name| name.eq_ignore_ascii_case(wanted)));
    if let Some(path) = &found {
        debug!(requested = %requested, resolved = %path, "Resolved via tree walk");
    }
    found
}
