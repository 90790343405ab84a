//! In-memory watchlist kept in step with the durable store.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, FixedOffset};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::store::WatchlistStore;
use super::types::{WatchlistChange, WatchlistItem};
use super::WatchlistError;
use crate::catalog::Movie;

/// Owns the in-memory watchlist and delegates durability to a [`WatchlistStore`].
///
/// At most one add and one remove may be outstanding per movie id. A second
/// request for the same operation is rejected with
/// [`WatchlistChange::InProgress`], never queued. When a write fails the
/// manager reloads from storage before returning the error, so memory and
/// storage agree after every completed call.
///
/// Store mutations read, modify and rewrite the whole list, so they are
/// serialized together with the matching in-memory update.
pub struct WatchlistManager {
    store: WatchlistStore,
    items: RwLock<Vec<WatchlistItem>>,
    writes: Mutex<()>,
    adding: Mutex<HashSet<u32>>,
    removing: Mutex<HashSet<u32>>,
    notify: watch::Sender<Vec<WatchlistItem>>,
}

/// Marks an operation as in flight until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<u32>>,
    id: u32,
}

impl<'a> InFlight<'a> {
    fn acquire(set: &'a Mutex<HashSet<u32>>, id: u32) -> Option<Self> {
        if lock(set).insert(id) {
            Some(Self { set, id })
        } else {
            None
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.id);
    }
}

fn lock(set: &Mutex<HashSet<u32>>) -> MutexGuard<'_, HashSet<u32>> {
    set.lock().unwrap_or_else(|e| e.into_inner())
}

impl WatchlistManager {
    /// Create a manager and load the current watchlist from `store`.
    pub fn new(store: WatchlistStore) -> Self {
        let items = store.get_watchlist();
        info!("Loaded watchlist with {} items", items.len());
        let (notify, _) = watch::channel(items.clone());
        Self {
            store,
            items: RwLock::new(items),
            writes: Mutex::new(()),
            adding: Mutex::new(HashSet::new()),
            removing: Mutex::new(HashSet::new()),
            notify,
        }
    }

    /// Subscribe to watchlist snapshots, published after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<WatchlistItem>> {
        self.notify.subscribe()
    }

    /// Save `movie` unless it is already saved or being saved.
    pub fn add_to_watchlist(&self, movie: &Movie) -> Result<WatchlistChange, WatchlistError> {
        let Some(_guard) = InFlight::acquire(&self.adding, movie.id) else {
            debug!("Add already in progress for movie {}", movie.id);
            return Ok(WatchlistChange::InProgress);
        };
        let _write = self.write_lock();
        if self.is_in_watchlist(movie.id) {
            return Ok(WatchlistChange::AlreadyPresent);
        }

        match self.store.add_movie(movie) {
            Ok(item) => {
                debug!("Added movie {} ('{}') to watchlist", item.id, item.title);
                self.write_items().push(item);
                self.publish();
                Ok(WatchlistChange::Added)
            }
            Err(e) => {
                warn!("Failed to add movie {} to watchlist: {}", movie.id, e);
                self.resync();
                Err(e)
            }
        }
    }

    /// Remove the movie with `id` unless it is absent or being removed.
    pub fn remove_from_watchlist(&self, id: u32) -> Result<WatchlistChange, WatchlistError> {
        let Some(_guard) = InFlight::acquire(&self.removing, id) else {
            debug!("Remove already in progress for movie {}", id);
            return Ok(WatchlistChange::InProgress);
        };
        let _write = self.write_lock();
        if !self.is_in_watchlist(id) {
            return Ok(WatchlistChange::NotPresent);
        }

        match self.store.remove_movie(id) {
            Ok(_) => {
                debug!("Removed movie {} from watchlist", id);
                self.write_items().retain(|i| i.id != id);
                self.publish();
                Ok(WatchlistChange::Removed)
            }
            Err(e) => {
                warn!("Failed to remove movie {} from watchlist: {}", id, e);
                self.resync();
                Err(e)
            }
        }
    }

    /// Remove `movie` if saved, otherwise save it.
    pub fn toggle_watchlist(&self, movie: &Movie) -> Result<WatchlistChange, WatchlistError> {
        if self.is_in_watchlist(movie.id) {
            self.remove_from_watchlist(movie.id)
        } else {
            self.add_to_watchlist(movie)
        }
    }

    /// Remove every saved movie.
    pub fn clear_watchlist(&self) -> Result<(), WatchlistError> {
        let _write = self.write_lock();
        match self.store.clear_watchlist() {
            Ok(()) => {
                self.write_items().clear();
                self.publish();
                Ok(())
            }
            Err(e) => {
                warn!("Failed to clear watchlist: {}", e);
                self.resync();
                Err(e.into())
            }
        }
    }

    /// Replace the in-memory watchlist with what storage holds.
    pub fn load_watchlist(&self) {
        let _write = self.write_lock();
        self.resync();
    }

    pub fn is_movie_being_added(&self, id: u32) -> bool {
        lock(&self.adding).contains(&id)
    }

    pub fn is_movie_being_removed(&self, id: u32) -> bool {
        lock(&self.removing).contains(&id)
    }

    pub fn is_movie_operation_in_progress(&self, id: u32) -> bool {
        self.is_movie_being_added(id) || self.is_movie_being_removed(id)
    }

    pub fn is_in_watchlist(&self, id: u32) -> bool {
        self.read_items().iter().any(|i| i.id == id)
    }

    pub fn get_watchlist_item(&self, id: u32) -> Option<WatchlistItem> {
        self.read_items().iter().find(|i| i.id == id).cloned()
    }

    /// Items in storage order.
    pub fn items(&self) -> Vec<WatchlistItem> {
        self.read_items().clone()
    }

    pub fn count(&self) -> usize {
        self.read_items().len()
    }

    /// Most recently added first.
    pub fn sorted_by_recency(&self) -> Vec<WatchlistItem> {
        let mut items = self.items();
        items.sort_by(|a, b| compare_added_at(b, a));
        items
    }

    /// Alphabetical by title, ignoring case.
    pub fn sorted_by_title(&self) -> Vec<WatchlistItem> {
        let mut items = self.items();
        items.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.title.cmp(&b.title))
        });
        items
    }

    /// Newest release first; undated items last.
    pub fn sorted_by_release_date(&self) -> Vec<WatchlistItem> {
        let mut items = self.items();
        items.sort_by(|a, b| b.release_date.cmp(&a.release_date));
        items
    }

    /// Items whose title contains `query`, case-insensitively.
    pub fn search(&self, query: &str) -> Vec<WatchlistItem> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.items();
        }
        self.read_items()
            .iter()
            .filter(|i| i.title.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Reload from storage. Caller holds the write lock.
    fn resync(&self) {
        let items = self.store.get_watchlist();
        *self.write_items() = items;
        self.publish();
    }

    fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self) {
        self.notify.send_replace(self.items());
    }

    fn read_items(&self) -> RwLockReadGuard<'_, Vec<WatchlistItem>> {
        self.items.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_items(&self) -> RwLockWriteGuard<'_, Vec<WatchlistItem>> {
        self.items.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_added_at(item: &WatchlistItem) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(&item.added_at).ok()
}

fn compare_added_at(a: &WatchlistItem, b: &WatchlistItem) -> Ordering {
    match (parse_added_at(a), parse_added_at(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.added_at.cmp(&b.added_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStorage, MemoryStorage};
    use crate::testing::{fixtures, MockStorage};
    use crate::watchlist::WATCHLIST_KEY;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn manager() -> (WatchlistManager, Arc<MockStorage>) {
        let storage = Arc::new(MockStorage::new());
        let manager = WatchlistManager::new(WatchlistStore::new(storage.clone()));
        (manager, storage)
    }

    fn stored(storage: &Arc<MockStorage>) -> Vec<WatchlistItem> {
        WatchlistStore::new(storage.clone()).get_watchlist()
    }

    #[test]
    fn test_new_loads_existing() {
        let storage = Arc::new(MemoryStorage::new());
        let store = WatchlistStore::new(storage.clone());
        store.add_movie(&fixtures::movie(1, "Heat")).unwrap();

        let manager = WatchlistManager::new(WatchlistStore::new(storage));
        assert_eq!(manager.count(), 1);
        assert!(manager.is_in_watchlist(1));
    }

    #[test]
    fn test_add_and_remove() {
        let (manager, storage) = manager();
        let movie = fixtures::movie(603, "The Matrix");

        assert_eq!(manager.add_to_watchlist(&movie).unwrap(), WatchlistChange::Added);
        assert_eq!(
            manager.add_to_watchlist(&movie).unwrap(),
            WatchlistChange::AlreadyPresent
        );
        assert_eq!(manager.count(), 1);
        assert_eq!(manager.items(), stored(&storage));

        assert_eq!(
            manager.remove_from_watchlist(603).unwrap(),
            WatchlistChange::Removed
        );
        assert_eq!(
            manager.remove_from_watchlist(603).unwrap(),
            WatchlistChange::NotPresent
        );
        assert_eq!(manager.count(), 0);
        assert!(stored(&storage).is_empty());
    }

    #[test]
    fn test_toggle() {
        let (manager, _) = manager();
        let movie = fixtures::movie(1, "Heat");
        assert_eq!(manager.toggle_watchlist(&movie).unwrap(), WatchlistChange::Added);
        assert_eq!(manager.toggle_watchlist(&movie).unwrap(), WatchlistChange::Removed);
        assert!(!manager.is_in_watchlist(1));
    }

    #[test]
    fn test_failed_add_resyncs_and_propagates() {
        let (manager, storage) = manager();
        manager.add_to_watchlist(&fixtures::movie(1, "Heat")).unwrap();

        storage.set_fail_writes(true);
        let err = manager
            .add_to_watchlist(&fixtures::movie(2, "Alien"))
            .unwrap_err();
        assert!(matches!(err, WatchlistError::Storage(_)));

        assert!(!manager.is_movie_being_added(2));
        assert_eq!(manager.items(), stored(&storage));
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn test_failed_remove_resyncs_and_propagates() {
        let (manager, storage) = manager();
        manager.add_to_watchlist(&fixtures::movie(1, "Heat")).unwrap();

        storage.set_fail_writes(true);
        let err = manager.remove_from_watchlist(1).unwrap_err();
        assert!(matches!(err, WatchlistError::Storage(_)));
        assert!(manager.is_in_watchlist(1));
        assert!(!manager.is_movie_being_removed(1));
    }

    #[test]
    fn test_external_change_surfaces_as_duplicate_and_resyncs() {
        let (manager, storage) = manager();
        // Another writer saved movie 1 behind the manager's back
        WatchlistStore::new(storage.clone())
            .add_movie(&fixtures::movie(1, "Heat"))
            .unwrap();

        let err = manager
            .add_to_watchlist(&fixtures::movie(1, "Heat"))
            .unwrap_err();
        assert_eq!(err, WatchlistError::Duplicate(1));
        assert!(manager.is_in_watchlist(1));
    }

    #[test]
    fn test_concurrent_add_is_rejected_while_in_flight() {
        let storage = Arc::new(MockStorage::new());
        let manager = Arc::new(WatchlistManager::new(WatchlistStore::new(storage.clone())));
        storage.block_writes();

        let worker = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.add_to_watchlist(&fixtures::movie(7, "Se7en")))
        };

        while !manager.is_movie_being_added(7) {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(manager.is_movie_operation_in_progress(7));
        assert_eq!(
            manager
                .add_to_watchlist(&fixtures::movie(7, "Se7en"))
                .unwrap(),
            WatchlistChange::InProgress
        );

        storage.release_writes();
        assert_eq!(worker.join().unwrap().unwrap(), WatchlistChange::Added);
        assert!(!manager.is_movie_operation_in_progress(7));
        assert_eq!(manager.count(), 1);
        assert_eq!(stored(&storage).len(), 1);
    }

    #[test]
    fn test_concurrent_adds_of_different_movies_both_persist() {
        let storage = Arc::new(MockStorage::new());
        let manager = Arc::new(WatchlistManager::new(WatchlistStore::new(storage.clone())));
        storage.block_writes();

        let workers: Vec<_> = [(1, "Heat"), (2, "Alien")]
            .into_iter()
            .map(|(id, title)| {
                let worker = Arc::clone(&manager);
                let handle =
                    thread::spawn(move || worker.add_to_watchlist(&fixtures::movie(id, title)));
                while !manager.is_movie_being_added(id) {
                    thread::sleep(Duration::from_millis(1));
                }
                handle
            })
            .collect();

        storage.release_writes();
        for worker in workers {
            assert_eq!(worker.join().unwrap().unwrap(), WatchlistChange::Added);
        }

        let items = manager.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items, stored(&storage));
    }

    #[test]
    fn test_concurrent_add_and_remove_of_different_movies() {
        let storage = Arc::new(MockStorage::new());
        let manager = Arc::new(WatchlistManager::new(WatchlistStore::new(storage.clone())));
        manager.add_to_watchlist(&fixtures::movie(1, "Heat")).unwrap();
        storage.block_writes();

        let remover = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.remove_from_watchlist(1))
        };
        while !manager.is_movie_being_removed(1) {
            thread::sleep(Duration::from_millis(1));
        }
        let adder = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.add_to_watchlist(&fixtures::movie(2, "Alien")))
        };
        while !manager.is_movie_being_added(2) {
            thread::sleep(Duration::from_millis(1));
        }

        storage.release_writes();
        assert_eq!(remover.join().unwrap().unwrap(), WatchlistChange::Removed);
        assert_eq!(adder.join().unwrap().unwrap(), WatchlistChange::Added);

        let items = manager.items();
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(items, stored(&storage));
    }

    #[test]
    fn test_memory_matches_storage_after_every_operation() {
        let (manager, storage) = manager();
        let movies: Vec<Movie> = (1..=6)
            .map(|i| fixtures::movie(i, &format!("Movie {}", i)))
            .collect();

        for step in 0..40u32 {
            let movie = &movies[(step * 7 % 6) as usize];
            if step % 3 == 0 {
                manager.remove_from_watchlist(movie.id).unwrap();
            } else {
                manager.toggle_watchlist(movie).unwrap();
            }

            let items = manager.items();
            assert_eq!(items, stored(&storage));
            let unique: HashSet<u32> = items.iter().map(|i| i.id).collect();
            assert_eq!(unique.len(), items.len());
        }
    }

    #[test]
    fn test_load_is_idempotent() {
        let (manager, _) = manager();
        manager.add_to_watchlist(&fixtures::movie(1, "Heat")).unwrap();
        manager.load_watchlist();
        let first = manager.items();
        manager.load_watchlist();
        assert_eq!(manager.items(), first);
    }

    #[test]
    fn test_clear() {
        let (manager, storage) = manager();
        manager.add_to_watchlist(&fixtures::movie(1, "Heat")).unwrap();
        manager.clear_watchlist().unwrap();
        assert_eq!(manager.count(), 0);
        assert!(stored(&storage).is_empty());
    }

    #[test]
    fn test_sorting_and_search() {
        let storage = Arc::new(MemoryStorage::new());
        let items = vec![
            fixtures::watchlist_item_dated(1, "heat", "1995-12-15", "2024-01-02T00:00:00.000Z"),
            fixtures::watchlist_item_dated(2, "Alien", "1979-05-25", "2024-03-01T00:00:00.000Z"),
            fixtures::watchlist_item_dated(3, "Zodiac", "", "2024-02-01T00:00:00.000Z"),
        ];
        WatchlistStore::new(storage.clone())
            .save_watchlist(&items)
            .unwrap();
        let manager = WatchlistManager::new(WatchlistStore::new(storage));

        let ids = |v: Vec<WatchlistItem>| v.iter().map(|i| i.id).collect::<Vec<_>>();
        assert_eq!(ids(manager.items()), vec![1, 2, 3]);
        assert_eq!(ids(manager.sorted_by_recency()), vec![2, 3, 1]);
        assert_eq!(ids(manager.sorted_by_title()), vec![2, 1, 3]);
        assert_eq!(ids(manager.sorted_by_release_date()), vec![1, 2, 3]);
        assert_eq!(ids(manager.search("ALI")), vec![2]);
        assert_eq!(ids(manager.search("  ")), vec![1, 2, 3]);
        assert!(manager.search("matrix").is_empty());
        assert_eq!(manager.get_watchlist_item(3).unwrap().title, "Zodiac");
        assert!(manager.get_watchlist_item(4).is_none());
    }

    #[test]
    fn test_subscribers_see_changes() {
        let (manager, _) = manager();
        let mut rx = manager.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        manager.add_to_watchlist(&fixtures::movie(1, "Heat")).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    #[test]
    fn test_stored_under_watchlist_key() {
        let (manager, storage) = manager();
        manager.add_to_watchlist(&fixtures::movie(1, "Heat")).unwrap();
        assert!(storage.get_item(WATCHLIST_KEY).unwrap().is_some());
    }
}
