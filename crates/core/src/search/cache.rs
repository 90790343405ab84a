//! Short-lived cache of search results keyed by normalized query.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::catalog::Movie;

/// Normalize raw input into a cache key.
pub fn normalize_query(raw: &str) -> String {
    raw.trim().to_string()
}

struct CacheEntry {
    results: Vec<Movie>,
    created_at: Instant,
}

/// Search results cache with lazy expiry.
///
/// Expired entries are never returned. They are removed when looked up or
/// by [`sweep_expired`](SearchCache::sweep_expired).
pub struct SearchCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl SearchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Cached results for `query`, if present and fresh.
    pub fn get(&self, query: &str) -> Option<Vec<Movie>> {
        let mut entries = self.entries();
        let expired = match entries.get(query) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => {
                return Some(entry.results.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(query);
            debug!("Evicted expired cache entry for '{}'", query);
        }
        None
    }

    /// Store `results` for `query`, replacing any previous entry.
    pub fn insert(&self, query: impl Into<String>, results: Vec<Movie>) {
        self.entries().insert(
            query.into(),
            CacheEntry {
                results,
                created_at: Instant::now(),
            },
        );
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Remove expired entries, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, e| e.created_at.elapsed() < self.ttl);
        before - entries.len()
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
