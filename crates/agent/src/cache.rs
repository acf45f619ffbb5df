//! Response cache for model completions.
//!
//! Keys combine a role label, a hash of the prompt and a hash of the sorted
//! context-file set. Entries older than the TTL read as absent. When the
//! cache grows past its limit the entry with the oldest creation time is
//! evicted; reads do not refresh an entry's age.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use codeclaw_config::CacheConfig;
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    response: String,
    created: Instant,
}

#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.max_entries)
    }

    /// Composite key; file order does not matter.
    pub fn key(role: &str, prompt: &str, files: &[String]) -> String {
        let mut sorted: Vec<&str> = files.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        let prompt_hash = Sha256::digest(prompt.as_bytes());
        let files_hash = Sha256::digest(sorted.join("\n").as_bytes());
        format!("{role}:{prompt_hash:x}:{files_hash:x}")
    }

    /// A fresh cached response, or `None` on a miss. An empty string is a hit.
    pub fn get(&self, role: &str, prompt: &str, files: &[String]) -> Option<String> {
        let key = Self::key(role, prompt, files);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        match entries.get(&key) {
            Some(entry) if entry.created.elapsed() <= self.ttl => {
                debug!(role, "Response cache hit");
                Some(entry.response.clone())
            }
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, role: &str, prompt: &str, files: &[String], response: impl Into<String>) {
        let key = Self::key(role, prompt, files);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key,
            CacheEntry {
                response: response.into(),
                created: Instant::now(),
            },
        );

        if entries.len() > self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                debug!("Evicted oldest cache entry");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn key_ignores_file_order() {
        assert_eq!(
            ResponseCache::key("intent", "p", &files(&["b.py", "a.py"])),
            ResponseCache::key("intent", "p", &files(&["a.py", "b.py"]))
        );
        assert_ne!(
            ResponseCache::key("intent", "p", &[]),
            ResponseCache::key("analyze", "p", &[])
        );
        assert_ne!(
            ResponseCache::key("intent", "p", &[]),
            ResponseCache::key("intent", "q", &[])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hit_within_ttl_miss_after() {
        let cache = ResponseCache::new(Duration::from_secs(300), 10);
        cache.put("intent", "find files", &[], "{\"actions\": []}");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("intent", "find files", &[]).as_deref(), Some("{\"actions\": []}"));

        tokio::time::advance(Duration::from_secs(300)).await;
        assert!(cache.get("intent", "find files", &[]).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_string_is_a_hit() {
        let cache = ResponseCache::new(Duration::from_secs(300), 10);
        cache.put("analyze", "x", &[], "");
        assert_eq!(cache.get("analyze", "x", &[]), Some(String::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_oldest_by_creation_not_by_use() {
        let cache = ResponseCache::new(Duration::from_secs(300), 2);
        cache.put("r", "first", &[], "1");
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put("r", "second", &[], "2");
        tokio::time::advance(Duration::from_secs(1)).await;

        // Reading "first" does not protect it.
        assert!(cache.get("r", "first", &[]).is_some());
        cache.put("r", "third", &[], "3");

        assert_eq!(cache.len(), 2);
        assert!(cache.get("r", "first", &[]).is_none());
        assert!(cache.get("r", "second", &[]).is_some());
        assert!(cache.get("r", "third", &[]).is_some());
    }

    #[test]
    fn overwrite_keeps_single_entry() {
        let cache = ResponseCache::new(Duration::from_secs(300), 4);
        cache.put("r", "p", &[], "old");
        cache.put("r", "p", &[], "new");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("r", "p", &[]).as_deref(), Some("new"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
