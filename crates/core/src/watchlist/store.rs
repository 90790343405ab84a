//! Durable mirror of the watchlist.
//!
//! Reads never fail: corrupt or malformed payloads are repaired in place and
//! an empty or cleaned list is returned. Writes propagate storage failures.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::types::WatchlistItem;
use super::WatchlistError;
use crate::catalog::Movie;
use crate::storage::{KeyValueStorage, StorageError};

/// Storage key the watchlist is kept under.
pub const WATCHLIST_KEY: &str = "movie-library-watchlist";

/// Persists the watchlist as a JSON array in key-value storage.
pub struct WatchlistStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl WatchlistStore {
    /// Create a store using the default watchlist key.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_key(storage, WATCHLIST_KEY)
    }

    /// Create a store under a custom key.
    pub fn with_key(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// The storage key in use.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the watchlist, repairing storage if its content is unusable.
    pub fn get_watchlist(&self) -> Vec<WatchlistItem> {
        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read watchlist from storage: {}", e);
                return Vec::new();
            }
        };

        let entries = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                warn!(
                    "Stored watchlist is not a list ({} bytes), resetting to empty",
                    raw.len()
                );
                self.reset_to_empty();
                return Vec::new();
            }
            Err(e) => {
                warn!(
                    "Stored watchlist is not valid JSON ({} bytes): {}, resetting to empty",
                    raw.len(),
                    e
                );
                self.reset_to_empty();
                return Vec::new();
            }
        };

        let total = entries.len();
        let items: Vec<WatchlistItem> = entries
            .into_iter()
            .filter(WatchlistItem::is_valid_shape)
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();

        if items.len() != total {
            warn!(
                "Dropped {} invalid watchlist entries, persisting cleaned list",
                total - items.len()
            );
            if let Err(e) = self.save_watchlist(&items) {
                warn!("Failed to persist cleaned watchlist: {}", e);
            }
        }

        items
    }

    /// Replace the stored watchlist with `items`.
    pub fn save_watchlist(&self, items: &[WatchlistItem]) -> Result<(), StorageError> {
        let json = serde_json::to_string(items)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage.set_item(&self.key, &json)?;
        debug!("Saved watchlist with {} items", items.len());
        Ok(())
    }

    /// Append `movie` to the watchlist, stamped with the current time.
    pub fn add_movie(&self, movie: &Movie) -> Result<WatchlistItem, WatchlistError> {
        let mut items = self.get_watchlist();
        if items.iter().any(|i| i.id == movie.id) {
            return Err(WatchlistError::Duplicate(movie.id));
        }

        let item = WatchlistItem::from_movie(movie);
        items.push(item.clone());
        self.save_watchlist(&items)?;
        Ok(item)
    }

    /// Remove the movie with `id`, returning the removed item.
    pub fn remove_movie(&self, id: u32) -> Result<WatchlistItem, WatchlistError> {
        let mut items = self.get_watchlist();
        let Some(pos) = items.iter().position(|i| i.id == id) else {
            return Err(WatchlistError::NotFound(id));
        };

        let removed = items.remove(pos);
        self.save_watchlist(&items)?;
        Ok(removed)
    }

    /// Whether a movie with `id` is stored.
    pub fn is_in_watchlist(&self, id: u32) -> bool {
        self.get_watchlist().iter().any(|i| i.id == id)
    }

    /// Remove every stored item.
    pub fn clear_watchlist(&self) -> Result<(), StorageError> {
        self.save_watchlist(&[])
    }

    /// Number of stored items.
    pub fn get_watchlist_count(&self) -> usize {
        self.get_watchlist().len()
    }

    fn reset_to_empty(&self) {
        if let Err(e) = self.storage.set_item(&self.key, "[]") {
            warn!("Failed to reset corrupted watchlist: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::testing::{fixtures, MockStorage};
    use serde_json::json;

    fn store_with(raw: Option<&str>) -> (WatchlistStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        if let Some(raw) = raw {
            storage.set_item(WATCHLIST_KEY, raw).unwrap();
        }
        (WatchlistStore::new(storage.clone()), storage)
    }

    #[test]
    fn test_absent_key_is_empty() {
        let (store, storage) = store_with(None);
        assert!(store.get_watchlist().is_empty());
        // Absence is not corruption, nothing is written
        assert_eq!(storage.get_item(WATCHLIST_KEY).unwrap(), None);
    }

    #[test]
    fn test_corrupted_json_is_reset() {
        let (store, storage) = store_with(Some("not json"));
        assert!(store.get_watchlist().is_empty());
        assert_eq!(
            storage.get_item(WATCHLIST_KEY).unwrap(),
            Some("[]".to_string())
        );
    }

    #[test]
    fn test_non_list_json_is_reset() {
        let (store, storage) = store_with(Some(r#"{"id": 1}"#));
        assert!(store.get_watchlist().is_empty());
        assert_eq!(
            storage.get_item(WATCHLIST_KEY).unwrap(),
            Some("[]".to_string())
        );
    }

    #[test]
    fn test_invalid_entries_are_filtered_and_persisted() {
        let raw = json!([
            {"id": 1, "title": "Heat", "poster_path": null,
             "release_date": "1995-12-15", "addedAt": "2024-01-01T00:00:00.000Z"},
            {"id": "2", "title": "Bad id", "poster_path": null,
             "release_date": "", "addedAt": "2024-01-01T00:00:00.000Z"},
            "garbage",
            {"id": 3, "title": "Alien", "poster_path": "/alien.jpg",
             "release_date": "1979-05-25", "addedAt": "2024-01-02T00:00:00.000Z"}
        ])
        .to_string();
        let (store, storage) = store_with(Some(&raw));

        let items = store.get_watchlist();
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 3]);

        let persisted: Vec<WatchlistItem> =
            serde_json::from_str(&storage.get_item(WATCHLIST_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted, items);
    }

    #[test]
    fn test_read_failure_returns_empty() {
        let storage = Arc::new(MockStorage::new());
        storage.set_fail_reads(true);
        let store = WatchlistStore::new(storage);
        assert!(store.get_watchlist().is_empty());
    }

    #[test]
    fn test_save_then_get_roundtrip() {
        let (store, _) = store_with(None);
        let items = vec![
            fixtures::watchlist_item(2, "Alien", "2024-01-02T00:00:00.000Z"),
            fixtures::watchlist_item(1, "Heat", "2024-01-01T00:00:00.000Z"),
        ];
        store.save_watchlist(&items).unwrap();
        assert_eq!(store.get_watchlist(), items);
    }

    #[test]
    fn test_save_propagates_quota_error() {
        let storage = Arc::new(MemoryStorage::with_quota(40));
        let store = WatchlistStore::new(storage);
        let items = vec![fixtures::watchlist_item(1, "Heat", "2024-01-01T00:00:00.000Z")];
        let err = store.save_watchlist(&items).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
    }

    #[test]
    fn test_add_duplicate_fails() {
        let (store, _) = store_with(None);
        let movie = fixtures::movie(1, "The Matrix");

        store.add_movie(&movie).unwrap();
        let err = store.add_movie(&movie).unwrap_err();
        assert_eq!(err, WatchlistError::Duplicate(1));

        let items = store.get_watchlist();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 1);
    }

    #[test]
    fn test_add_appends_in_insertion_order() {
        let (store, _) = store_with(None);
        store.add_movie(&fixtures::movie(5, "B")).unwrap();
        store.add_movie(&fixtures::movie(2, "A")).unwrap();
        let ids: Vec<u32> = store.get_watchlist().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![5, 2]);
    }

    #[test]
    fn test_remove_missing_fails_and_leaves_list() {
        let (store, _) = store_with(None);
        store.add_movie(&fixtures::movie(1, "The Matrix")).unwrap();
        let before = store.get_watchlist();

        let err = store.remove_movie(999).unwrap_err();
        assert_eq!(err, WatchlistError::NotFound(999));
        assert_eq!(store.get_watchlist(), before);
    }

    #[test]
    fn test_remove_and_count() {
        let (store, _) = store_with(None);
        store.add_movie(&fixtures::movie(1, "A")).unwrap();
        store.add_movie(&fixtures::movie(2, "B")).unwrap();
        assert_eq!(store.get_watchlist_count(), 2);

        let removed = store.remove_movie(1).unwrap();
        assert_eq!(removed.id, 1);
        assert!(!store.is_in_watchlist(1));
        assert!(store.is_in_watchlist(2));
        assert_eq!(store.get_watchlist_count(), 1);
    }

    #[test]
    fn test_clear() {
        let (store, _) = store_with(None);
        store.add_movie(&fixtures::movie(1, "A")).unwrap();
        store.clear_watchlist().unwrap();
        assert_eq!(store.get_watchlist_count(), 0);
    }

    #[test]
    fn test_write_failure_on_add_propagates() {
        let storage = Arc::new(MockStorage::new());
        let store = WatchlistStore::new(storage.clone());
        storage.set_fail_writes(true);

        let err = store.add_movie(&fixtures::movie(1, "A")).unwrap_err();
        assert!(matches!(err, WatchlistError::Storage(_)));
        assert!(store.get_watchlist().is_empty());
    }
}
