//! Orchestrates which movie set is shown and tracks loading and errors.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::{BrowsingState, DisplayMode};
use crate::catalog::{CatalogError, MovieCatalog};
use crate::search::{SearchConfig, SearchEvent, SearchPhase, SearchPipeline};

/// Drives popular listings and searches, publishing [`BrowsingState`] snapshots.
pub struct MovieBrowser {
    catalog: Arc<dyn MovieCatalog>,
    pipeline: SearchPipeline,
    state: Arc<watch::Sender<BrowsingState>>,
    pump: JoinHandle<()>,
}

impl MovieBrowser {
    /// Create a browser with its own search pipeline. Must be called within a Tokio runtime.
    pub fn new(catalog: Arc<dyn MovieCatalog>, search_config: SearchConfig) -> Self {
        let (pipeline, events) = SearchPipeline::new(Arc::clone(&catalog), search_config);
        let (state, _) = watch::channel(BrowsingState::default());
        let state = Arc::new(state);
        let pump = tokio::spawn(Self::pump_events(Arc::clone(&state), events));

        Self {
            catalog,
            pipeline,
            state,
            pump,
        }
    }

    /// Subscribe to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<BrowsingState> {
        self.state.subscribe()
    }

    /// Current state.
    pub fn snapshot(&self) -> BrowsingState {
        self.state.borrow().clone()
    }

    pub fn pipeline(&self) -> &SearchPipeline {
        &self.pipeline
    }

    /// Initial load: fetch popular movies unless something is already
    /// loaded, loading, or failed. Returns whether a fetch was made.
    pub async fn mount(&self) -> bool {
        let should_fetch = self.state.send_if_modified(|s| {
            if s.popular.is_empty() && !s.loading_popular && s.error.is_none() {
                s.loading_popular = true;
                true
            } else {
                false
            }
        });
        if !should_fetch {
            debug!("Skipping initial popular fetch");
            return false;
        }

        // Errors are recorded in the state.
        let _ = self.fetch_popular(1, false).await;
        true
    }

    /// Load a popular page, replacing what is shown.
    pub async fn load_popular(&self, page: u32) -> Result<(), CatalogError> {
        self.fetch_popular(page, false).await
    }

    /// Append the next popular page, if any.
    pub async fn load_next_page(&self) -> Result<bool, CatalogError> {
        let next = {
            let s = self.state.borrow();
            if s.loading_popular || !s.has_more_popular() {
                return Ok(false);
            }
            s.popular_page + 1
        };
        self.fetch_popular(next, true).await.map(|_| true)
    }

    /// Update the query as typed; searches after the debounce delay.
    pub fn set_query(&self, raw: &str) -> SearchPhase {
        self.state.send_modify(|s| s.query = raw.to_string());
        self.pipeline.input(raw)
    }

    /// Search right away (form submit).
    pub fn submit_search(&self, raw: &str) -> SearchPhase {
        self.state.send_modify(|s| s.query = raw.to_string());
        self.pipeline.search_now(raw)
    }

    /// Drop the query and go back to popular movies.
    pub fn clear_search(&self) {
        self.state.send_modify(|s| s.query.clear());
        self.pipeline.clear();
    }

    /// Clear the error and repeat the operation that failed. A query that is
    /// now too short to search keeps the error, which is returned.
    pub async fn retry(&self) -> Result<(), CatalogError> {
        let (searching, query, page, previous) = {
            let s = self.state.borrow();
            (
                s.is_searching(),
                s.query.clone(),
                s.requested_page.max(1),
                s.error.clone(),
            )
        };
        self.state.send_modify(|s| s.error = None);

        if searching {
            info!("Retrying search for '{}'", query.trim());
            if self.pipeline.search_now(&query) != SearchPhase::TooShort {
                return Ok(());
            }

            // Nothing was dispatched, so the failure still stands.
            debug!("Query '{}' too short to retry", query.trim());
            let Some(error) = previous else {
                return Ok(());
            };
            self.state.send_modify(|s| s.error = Some(error.clone()));
            Err(error)
        } else {
            info!("Retrying popular movies page {}", page);
            self.fetch_popular(page, page > 1).await
        }
    }

    async fn fetch_popular(&self, page: u32, append: bool) -> Result<(), CatalogError> {
        self.state.send_modify(|s| {
            s.loading_popular = true;
            s.error = None;
            s.requested_page = page;
        });

        match self.catalog.popular_movies(page).await {
            Ok(result) => {
                debug!(
                    "Loaded popular page {}/{} ({} movies)",
                    result.page,
                    result.total_pages,
                    result.results.len()
                );
                self.state.send_modify(|s| {
                    s.loading_popular = false;
                    if append {
                        let fresh: Vec<_> = result
                            .results
                            .into_iter()
                            .filter(|m| !s.popular.iter().any(|p| p.id == m.id))
                            .collect();
                        s.popular.extend(fresh);
                    } else {
                        s.popular = result.results;
                    }
                    s.popular_page = page;
                    s.popular_total_pages = result.total_pages;
                });
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load popular movies page {}: {}", page, e);
                self.state.send_modify(|s| {
                    s.loading_popular = false;
                    s.error = Some(e.clone());
                });
                Err(e)
            }
        }
    }

    async fn pump_events(
        state: Arc<watch::Sender<BrowsingState>>,
        mut events: mpsc::UnboundedReceiver<SearchEvent>,
    ) {
        while let Some(event) = events.recv().await {
            state.send_modify(|s| apply_event(s, event));
        }
    }
}

impl Drop for MovieBrowser {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

fn apply_event(state: &mut BrowsingState, event: SearchEvent) {
    match event {
        SearchEvent::Started { .. } => {
            state.loading_search = true;
            state.error = None;
        }
        SearchEvent::Results { movies, .. } => {
            state.loading_search = false;
            state.error = None;
            state.search_results = movies;
            state.mode = DisplayMode::SearchResults;
        }
        SearchEvent::Failed { error, .. } => {
            state.loading_search = false;
            state.error = Some(error);
        }
        SearchEvent::Cleared => {
            state.loading_search = false;
            state.error = None;
            state.search_results.clear();
            state.mode = DisplayMode::Popular;
        }
    }
}
