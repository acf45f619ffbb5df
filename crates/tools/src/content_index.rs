//! Content index over the tracked working set.
//!
//! The index is an immutable [`IndexSnapshot`] published behind a single
//! shared pointer. A rebuild constructs a complete new snapshot off to the
//! side and swaps the pointer, so readers see either the previous index or
//! the new one and never a half-built mix. Only one rebuild runs at a time.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use codeclaw_config::IndexConfig;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::file_store::FileStore;

/// One line matched by [`ContentIndex::search_content`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMatch {
    pub path: String,
    /// 1-based
    pub line: usize,
    pub text: String,
}

/// A fully built index. Never mutated after publication.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    words: HashMap<String, BTreeSet<String>>,
    modified: HashMap<String, Option<DateTime<Utc>>>,
    built_at: Option<Instant>,
}

impl IndexSnapshot {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Files containing `word` (case-insensitive).
    pub fn files_for(&self, word: &str) -> Option<&BTreeSet<String>> {
        self.words.get(&word.to_lowercase())
    }

    /// Modification time recorded when the file was indexed.
    pub fn modified(&self, path: &str) -> Option<DateTime<Utc>> {
        self.modified.get(path).copied().flatten()
    }

    pub fn indexed_files(&self) -> usize {
        self.modified.len()
    }

    pub fn built_at(&self) -> Option<Instant> {
        self.built_at
    }
}

/// Lowercased word tokens longer than two characters.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| word.chars().count() > 2)
        .map(str::to_lowercase)
}

pub struct ContentIndex {
    store: FileStore,
    refresh: Duration,
    max_name_results: usize,
    max_content_matches: usize,
    max_matches_per_file: usize,
    current: RwLock<Arc<IndexSnapshot>>,
    rebuilding: AtomicBool,
}

impl ContentIndex {
    pub fn new(store: FileStore, config: &IndexConfig) -> Self {
        Self {
            store,
            refresh: Duration::from_secs(config.refresh_secs),
            max_name_results: config.max_name_results,
            max_content_matches: config.max_content_matches,
            max_matches_per_file: config.max_matches_per_file,
            current: RwLock::new(Arc::new(IndexSnapshot::default())),
            rebuilding: AtomicBool::new(false),
        }
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    fn publish(&self, snapshot: IndexSnapshot) {
        let snapshot = Arc::new(snapshot);
        match self.current.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    /// Whether a rebuild would run right now.
    pub fn is_stale(&self) -> bool {
        let current = self.snapshot();
        match current.built_at {
            _ if current.is_empty() => true,
            Some(built_at) => built_at.elapsed() >= self.refresh,
            None => true,
        }
    }

    /// Rebuild from `files` unless the index is fresh.
    ///
    /// Returns `true` if a new snapshot was published. Skips when another
    /// rebuild is already in flight.
    pub fn rebuild(&self, files: &[String]) -> bool {
        if !self.is_stale() {
            debug!("Index fresh, skipping rebuild");
            return false;
        }
        if self
            .rebuilding
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Rebuild already in flight");
            return false;
        }

        let mut snapshot = IndexSnapshot::default();
        for path in files {
            let content = self.store.read(path);
            for word in tokenize(&content) {
                snapshot.words.entry(word).or_default().insert(path.clone());
            }
            snapshot.modified.insert(path.clone(), self.store.modified(path));
        }
        snapshot.built_at = Some(Instant::now());

        info!(files = files.len(), tokens = snapshot.words.len(), "Content index rebuilt");
        self.publish(snapshot);
        self.rebuilding.store(false, Ordering::Release);
        true
    }

    /// Rebuild on a blocking worker. Fire and forget; the handle is only
    /// useful to tests.
    pub fn spawn_rebuild(self: &Arc<Self>, files: Vec<String>) -> Option<JoinHandle<bool>> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            self.rebuild(&files);
            return None;
        };
        let index = Arc::clone(self);
        Some(handle.spawn_blocking(move || index.rebuild(&files)))
    }

    /// Files whose basename or path contains `query`, case-insensitively.
    /// An empty query returns `files` unfiltered. Capped.
    pub fn search_by_name(&self, query: &str, files: &[String]) -> Vec<String> {
        let query = query.trim().to_lowercase();
        files
            .iter()
            .filter(|path| query.is_empty() || name_matches(path, &query))
            .take(self.max_name_results)
            .cloned()
            .collect()
    }

    /// Name matches plus files the index links to any token of `query`.
    pub fn search_by_name_or_content(&self, query: &str, files: &[String]) -> Vec<String> {
        let lowered = query.trim().to_lowercase();
        if lowered.is_empty() {
            return self.search_by_name("", files);
        }

        let snapshot = self.snapshot();
        let mut via_index: HashSet<&str> = HashSet::new();
        for word in tokenize(&lowered) {
            if let Some(paths) = snapshot.words.get(&word) {
                via_index.extend(paths.iter().map(String::as_str));
            }
        }

        files
            .iter()
            .filter(|path| name_matches(path, &lowered) || via_index.contains(path.as_str()))
            .take(self.max_name_results)
            .cloned()
            .collect()
    }

    /// Brute-force line scan of each file for `query`, case-insensitively.
    pub fn search_content(&self, query: &str, files: &[String]) -> Vec<ContentMatch> {
        let query = query.trim().to_lowercase();
        let mut matches = Vec::new();
        if query.is_empty() {
            return matches;
        }

        for path in files {
            let content = self.store.read(path);
            let hits = content
                .lines()
                .enumerate()
                .filter(|(_, line)| line.to_lowercase().contains(&query))
                .take(self.max_matches_per_file);
            for (number, line) in hits {
                matches.push(ContentMatch {
                    path: path.clone(),
                    line: number + 1,
                    text: line.trim().to_string(),
                });
                if matches.len() >= self.max_content_matches {
                    return matches;
                }
            }
        }
        matches
    }
}

fn name_matches(path: &str, lowered_query: &str) -> bool {
    let lowered = path.to_lowercase();
    let basename = lowered.rsplit('/').next().unwrap_or(&lowered);
    basename.contains(lowered_query) || lowered.contains(lowered_query)
}
