//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external seams (the
//! remote catalog and durable storage), allowing the pipeline, browser and
//! watchlist to be tested without network or disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use movie_library_core::testing::{fixtures, MockCatalog, MockStorage};
//!
//! let catalog = MockCatalog::new();
//! let storage = MockStorage::new();
//!
//! // Configure mock responses
//! catalog.set_movies(fixtures::movies(40)).await;
//! storage.set_fail_writes(true);
//! ```

mod mock_catalog;
mod mock_storage;

pub use mock_catalog::{MockCatalog, RecordedCatalogQuery};
pub use mock_storage::MockStorage;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::Movie;
    use crate::watchlist::WatchlistItem;

    /// Create a test movie with reasonable defaults.
    pub fn movie(id: u32, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            poster_path: Some(format!("/poster-{}.jpg", id)),
            release_date: format!("{}-06-15", 1980 + id % 40),
            overview: format!("A movie about {}.", title.to_lowercase()),
            vote_average: 7.5,
            genre_ids: vec![18, 53],
        }
    }

    /// Create `count` movies with ids starting at 1.
    pub fn movies(count: u32) -> Vec<Movie> {
        (1..=count)
            .map(|i| movie(i, &format!("Movie {}", i)))
            .collect()
    }

    /// Create a stored watchlist item with a fixed timestamp.
    pub fn watchlist_item(id: u32, title: &str, added_at: &str) -> WatchlistItem {
        WatchlistItem {
            id,
            title: title.to_string(),
            poster_path: Some(format!("/poster-{}.jpg", id)),
            release_date: format!("{}-06-15", 1980 + id % 40),
            added_at: added_at.to_string(),
        }
    }

    /// Create a stored watchlist item with explicit release date.
    pub fn watchlist_item_dated(
        id: u32,
        title: &str,
        release_date: &str,
        added_at: &str,
    ) -> WatchlistItem {
        WatchlistItem {
            release_date: release_date.to_string(),
            ..watchlist_item(id, title, added_at)
        }
    }
}
