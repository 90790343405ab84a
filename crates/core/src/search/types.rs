use crate::catalog::{CatalogError, Movie};

/// Where the pipeline is for the current input value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchPhase {
    /// Input is empty; results cleared.
    #[default]
    Idle,
    /// Input is shorter than the minimum; nothing searched, nothing cleared.
    TooShort,
    /// Waiting for the debounce timer.
    Debouncing,
    /// Request in flight.
    Searching,
    /// Last search finished (results, cache hit or failure).
    Settled,
}

/// Notifications emitted by the search pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    /// A network request was dispatched for `query`.
    Started { query: String },
    /// Results are available for `query`.
    Results {
        query: String,
        movies: Vec<Movie>,
        from_cache: bool,
    },
    /// The request for `query` failed.
    Failed { query: String, error: CatalogError },
    /// Input was cleared; any shown search results should be dropped.
    Cleared,
}
