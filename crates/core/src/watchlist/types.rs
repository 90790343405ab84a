use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::Movie;

/// A saved movie. `added_at` is set once at creation and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub id: u32,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: String,
    /// ISO-8601 timestamp, millisecond precision, UTC.
    #[serde(rename = "addedAt")]
    pub added_at: String,
}

impl WatchlistItem {
    /// Snapshot the listed fields of `movie`, stamped with the current time.
    pub fn from_movie(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            poster_path: movie.poster_path.clone(),
            release_date: movie.release_date.clone(),
            added_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Check that a stored JSON value has the shape of an item.
    pub fn is_valid_shape(value: &Value) -> bool {
        let Some(obj) = value.as_object() else {
            return false;
        };

        let id_ok = obj
            .get("id")
            .and_then(Value::as_u64)
            .is_some_and(|id| id <= u32::MAX as u64);
        let title_ok = obj.get("title").is_some_and(Value::is_string);
        let poster_ok = obj
            .get("poster_path")
            .is_some_and(|p| p.is_null() || p.is_string());
        let release_ok = obj.get("release_date").is_some_and(Value::is_string);
        let added_ok = obj.get("addedAt").is_some_and(Value::is_string);

        id_ok && title_ok && poster_ok && release_ok && added_ok
    }
}

/// Result of a watchlist mutation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchlistChange {
    /// The movie was saved.
    Added,
    /// The movie was removed.
    Removed,
    /// Nothing to do: the movie was already saved.
    AlreadyPresent,
    /// Nothing to do: the movie was not saved.
    NotPresent,
    /// Rejected: the same operation is already running for this movie.
    InProgress,
}

impl WatchlistChange {
    /// Whether the request changed the watchlist.
    pub fn is_applied(self) -> bool {
        matches!(self, WatchlistChange::Added | WatchlistChange::Removed)
    }
}
