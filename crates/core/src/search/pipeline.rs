//! Keystroke-driven search with debounce, caching and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cache::{normalize_query, SearchCache};
use super::config::SearchConfig;
use super::timer::DebounceTimer;
use super::types::{SearchEvent, SearchPhase};
use crate::catalog::{CatalogError, MovieCatalog, MoviePage};

/// Turns raw input into debounced, cached, cancellable catalog searches.
///
/// Outcomes are delivered as [`SearchEvent`]s on the receiver returned by
/// [`SearchPipeline::new`]. A request superseded by a newer query is aborted
/// and produces no event.
pub struct SearchPipeline {
    inner: Arc<Inner>,
}

struct Inner {
    catalog: Arc<dyn MovieCatalog>,
    cache: SearchCache,
    config: SearchConfig,
    state: Mutex<PipelineState>,
    events: mpsc::UnboundedSender<SearchEvent>,
    shutdown_tx: broadcast::Sender<()>,
    sweeper_running: AtomicBool,
}

#[derive(Default)]
struct PipelineState {
    phase: SearchPhase,
    timer: Option<DebounceTimer>,
    /// Bumped whenever the pending timer is replaced or cancelled.
    timer_seq: u64,
    in_flight: Option<InFlightSearch>,
    /// Bumped whenever the in-flight request is replaced or cancelled.
    generation: u64,
}

struct InFlightSearch {
    query: String,
    handle: JoinHandle<()>,
}

impl PipelineState {
    fn cancel_timer(&mut self) {
        self.timer_seq += 1;
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    fn cancel_in_flight(&mut self) {
        self.generation += 1;
        if let Some(search) = self.in_flight.take() {
            debug!("Aborting in-flight search for '{}'", search.query);
            search.handle.abort();
        }
    }
}

impl SearchPipeline {
    /// Create a pipeline and the receiver its events are delivered on.
    pub fn new(
        catalog: Arc<dyn MovieCatalog>,
        config: SearchConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SearchEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = broadcast::channel(1);
        let inner = Inner {
            catalog,
            cache: SearchCache::new(config.cache_ttl()),
            config,
            state: Mutex::new(PipelineState::default()),
            events,
            shutdown_tx,
            sweeper_running: AtomicBool::new(false),
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            rx,
        )
    }

    /// Feed the current input value. Restarts the debounce timer.
    pub fn input(&self, raw: &str) -> SearchPhase {
        let query = normalize_query(raw);
        if query.is_empty() {
            self.clear();
            return SearchPhase::Idle;
        }

        let mut state = self.inner.state();
        state.cancel_timer();

        if self.is_too_short(&query) {
            state.phase = SearchPhase::TooShort;
            return SearchPhase::TooShort;
        }

        let seq = state.timer_seq;
        let inner = Arc::clone(&self.inner);
        state.timer = Some(DebounceTimer::start(self.inner.config.debounce(), move || {
            inner.on_timer_elapsed(seq, query);
        }));
        state.phase = SearchPhase::Debouncing;
        SearchPhase::Debouncing
    }

    /// Search immediately, skipping the debounce timer.
    pub fn search_now(&self, raw: &str) -> SearchPhase {
        let query = normalize_query(raw);
        if query.is_empty() {
            self.clear();
            return SearchPhase::Idle;
        }

        let mut state = self.inner.state();
        state.cancel_timer();
        if self.is_too_short(&query) {
            state.phase = SearchPhase::TooShort;
            return SearchPhase::TooShort;
        }

        self.inner.start_search(&mut state, query)
    }

    /// Cancel pending and in-flight work and return to idle.
    pub fn clear(&self) {
        {
            let mut state = self.inner.state();
            state.cancel_timer();
            state.cancel_in_flight();
            state.phase = SearchPhase::Idle;
        }
        self.inner.emit(SearchEvent::Cleared);
    }

    pub fn phase(&self) -> SearchPhase {
        self.inner.state().phase
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Remove expired cache entries now.
    pub fn sweep_expired(&self) -> usize {
        self.inner.cache.sweep_expired()
    }

    /// Number of cache entries, including expired ones not yet swept.
    pub fn cache_len(&self) -> usize {
        self.inner.cache.len()
    }

    /// Spawn the periodic cache sweep. Calling it again is a no-op.
    pub fn start_cache_sweeper(&self) {
        if self.inner.sweeper_running.swap(true, Ordering::SeqCst) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();
        let period = self.inner.config.sweep_interval();

        tokio::spawn(async move {
            debug!("Search cache sweeper started");
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = inner.cache.sweep_expired();
                        if removed > 0 {
                            debug!("Swept {} expired search cache entries", removed);
                        }
                    }
                }
            }
            inner.sweeper_running.store(false, Ordering::SeqCst);
            debug!("Search cache sweeper stopped");
        });
    }

    /// Cancel all pending work and stop the sweeper.
    pub fn shutdown(&self) {
        let mut state = self.inner.state();
        state.cancel_timer();
        state.cancel_in_flight();
        let _ = self.inner.shutdown_tx.send(());
    }

    fn is_too_short(&self, query: &str) -> bool {
        query.chars().count() < self.inner.config.min_query_length
    }
}

impl Drop for SearchPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: SearchEvent) {
        if self.events.send(event).is_err() {
            debug!("Search event dropped, no receiver");
        }
    }

    fn on_timer_elapsed(self: &Arc<Self>, seq: u64, query: String) {
        let mut state = self.state();
        if state.timer_seq != seq {
            return;
        }
        state.timer = None;
        self.start_search(&mut state, query);
    }

    /// Serve from cache or dispatch a request. Called with the state lock held.
    fn start_search(self: &Arc<Self>, state: &mut PipelineState, query: String) -> SearchPhase {
        if let Some(movies) = self.cache.get(&query) {
            debug!("Search cache hit for '{}'", query);
            state.cancel_in_flight();
            state.phase = SearchPhase::Settled;
            self.emit(SearchEvent::Results {
                query,
                movies,
                from_cache: true,
            });
            return SearchPhase::Settled;
        }

        if let Some(search) = &state.in_flight {
            if search.query == query {
                debug!("Search for '{}' already in flight", query);
                state.phase = SearchPhase::Searching;
                return SearchPhase::Searching;
            }
        }

        state.cancel_in_flight();
        let generation = state.generation;
        state.phase = SearchPhase::Searching;

        info!("Searching catalog for '{}'", query);
        self.emit(SearchEvent::Started {
            query: query.clone(),
        });

        let inner = Arc::clone(self);
        let request_query = query.clone();
        let handle = tokio::spawn(async move {
            let result = inner.catalog.search_movies(&request_query, 1).await;
            inner.finish_search(generation, request_query, result);
        });
        state.in_flight = Some(InFlightSearch { query, handle });
        SearchPhase::Searching
    }

    fn finish_search(
        &self,
        generation: u64,
        query: String,
        result: Result<MoviePage, CatalogError>,
    ) {
        let mut state = self.state();
        if state.generation != generation {
            debug!("Discarding superseded results for '{}'", query);
            return;
        }
        state.in_flight = None;
        if state.phase == SearchPhase::Searching {
            state.phase = SearchPhase::Settled;
        }

        match result {
            Ok(page) => {
                debug!("Search for '{}' returned {} movies", query, page.results.len());
                self.cache.insert(query.clone(), page.results.clone());
                self.emit(SearchEvent::Results {
                    query,
                    movies: page.results,
                    from_cache: false,
                });
            }
            Err(error) => {
                warn!("Search for '{}' failed: {}", query, error);
                self.emit(SearchEvent::Failed { query, error });
            }
        }
    }
}
