//! The personal "watch later" list.
//!
//! [`WatchlistStore`] is the durable mirror in key-value storage and
//! [`WatchlistManager`] is the in-memory view the rest of the application
//! talks to.

mod manager;
mod store;
mod types;

pub use manager::WatchlistManager;
pub use store::{WatchlistStore, WATCHLIST_KEY};
pub use types::*;

use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by watchlist mutations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WatchlistError {
    /// The movie is already saved.
    #[error("Movie {0} is already in the watchlist")]
    Duplicate(u32),

    /// The movie is not saved.
    #[error("Movie {0} is not in the watchlist")]
    NotFound(u32),

    /// Durable storage rejected the write.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
