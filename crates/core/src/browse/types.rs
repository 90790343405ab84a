use crate::catalog::{CatalogError, Movie};

/// Which movie set is on display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Popular,
    SearchResults,
}

/// Transient browsing state. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowsingState {
    pub mode: DisplayMode,
    /// Popular movies loaded so far, across pages.
    pub popular: Vec<Movie>,
    /// Last popular page loaded (0 = none).
    pub popular_page: u32,
    pub popular_total_pages: u32,
    /// Page of the most recent popular request, successful or not.
    pub requested_page: u32,
    pub search_results: Vec<Movie>,
    /// Raw query text as typed.
    pub query: String,
    pub loading_popular: bool,
    pub loading_search: bool,
    pub error: Option<CatalogError>,
}

impl BrowsingState {
    /// The movie set currently on display.
    pub fn movies(&self) -> &[Movie] {
        match self.mode {
            DisplayMode::Popular => &self.popular,
            DisplayMode::SearchResults => &self.search_results,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading_popular || self.loading_search
    }

    /// A non-empty query is active.
    pub fn is_searching(&self) -> bool {
        !self.query.trim().is_empty()
    }

    pub fn has_movies(&self) -> bool {
        !self.movies().is_empty()
    }

    /// Nothing to show and nothing pending: the "no results" view.
    pub fn is_empty(&self) -> bool {
        !self.has_movies() && !self.is_loading() && self.error.is_none()
    }

    /// Whether the current error should be offered a retry action.
    pub fn can_retry(&self) -> bool {
        self.error.as_ref().is_some_and(CatalogError::is_retryable)
    }

    /// More popular pages are available.
    pub fn has_more_popular(&self) -> bool {
        self.popular_page < self.popular_total_pages
    }
}
