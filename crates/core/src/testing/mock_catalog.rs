//! Mock movie catalog for testing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::catalog::{
    validate_page, validate_query, CatalogError, Movie, MovieCatalog, MoviePage,
};

/// A recorded catalog query for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCatalogQuery {
    Popular { page: u32 },
    Search { query: String, page: u32 },
}

/// Mock implementation of the MovieCatalog trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable movies, paginated like the real API
/// - Track queries for assertions
/// - Simulate failures and slow responses
///
/// # Example
///
/// ```rust,ignore
/// use movie_library_core::testing::{MockCatalog, fixtures};
///
/// let catalog = MockCatalog::new();
/// catalog.add_movie(fixtures::movie(603, "The Matrix")).await;
///
/// let page = catalog.search_movies("matrix", 1).await?;
/// assert_eq!(page.results.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockCatalog {
    /// Movies in popularity order.
    movies: Arc<RwLock<Vec<Movie>>>,
    /// Recorded queries.
    queries: Arc<RwLock<Vec<RecordedCatalogQuery>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<CatalogError>>>,
    /// Artificial latency applied to every response.
    delay: Arc<RwLock<Option<Duration>>>,
    page_size: usize,
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalog {
    /// Create a new empty mock catalog with TMDB's page size of 20.
    pub fn new() -> Self {
        Self {
            movies: Arc::new(RwLock::new(Vec::new())),
            queries: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(None)),
            page_size: 20,
        }
    }

    // =========================================================================
    // Movies Configuration
    // =========================================================================

    /// Add a movie at the end of the popularity order.
    pub async fn add_movie(&self, movie: Movie) {
        self.movies.write().await.push(movie);
    }

    /// Set all movies at once.
    pub async fn set_movies(&self, movies: Vec<Movie>) {
        *self.movies.write().await = movies;
    }

    /// Delay every response by `delay`.
    pub async fn set_response_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    // =========================================================================
    // Query Recording
    // =========================================================================

    /// Get all recorded queries.
    pub async fn recorded_queries(&self) -> Vec<RecordedCatalogQuery> {
        self.queries.read().await.clone()
    }

    /// Search queries only, in call order.
    pub async fn search_queries(&self) -> Vec<String> {
        self.queries
            .read()
            .await
            .iter()
            .filter_map(|q| match q {
                RecordedCatalogQuery::Search { query, .. } => Some(query.clone()),
                RecordedCatalogQuery::Popular { .. } => None,
            })
            .collect()
    }

    /// Get the number of queries performed.
    pub async fn query_count(&self) -> usize {
        self.queries.read().await.len()
    }

    /// Clear recorded queries.
    pub async fn clear_recorded(&self) {
        self.queries.write().await.clear();
    }

    // =========================================================================
    // Error Injection
    // =========================================================================

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    async fn take_error(&self) -> Option<CatalogError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, query: RecordedCatalogQuery) {
        self.queries.write().await.push(query);
    }

    async fn respond(&self, matching: Vec<Movie>, page: u32) -> Result<MoviePage, CatalogError> {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let total_results = matching.len();
        let total_pages = total_results.div_ceil(self.page_size).max(1);
        let results = matching
            .into_iter()
            .skip((page as usize - 1) * self.page_size)
            .take(self.page_size)
            .collect();

        Ok(MoviePage {
            page,
            results,
            total_pages: total_pages as u32,
            total_results: total_results as u32,
        })
    }
}

#[async_trait]
impl MovieCatalog for MockCatalog {
    async fn popular_movies(&self, page: u32) -> Result<MoviePage, CatalogError> {
        validate_page(page)?;

        self.record(RecordedCatalogQuery::Popular { page }).await;

        let movies = self.movies.read().await.clone();
        self.respond(movies, page).await
    }

    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        let query = validate_query(query)?;
        validate_page(page)?;

        self.record(RecordedCatalogQuery::Search {
            query: query.to_string(),
            page,
        })
        .await;

        let query_lower = query.to_lowercase();
        let matching: Vec<Movie> = self
            .movies
            .read()
            .await
            .iter()
            .filter(|m| m.title.to_lowercase().contains(&query_lower))
            .cloned()
            .collect();

        self.respond(matching, page).await
    }
}
