use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use movie_library_core::{
    load_config, load_config_from_env, validate_config, BrowsingState, Config, MovieBrowser,
    MovieCatalog, SanitizedConfig, SqliteStorage, TmdbClient, WatchlistManager, WatchlistStore,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("movie-library {} starting", VERSION);

    let config = load_configuration()?;
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        "Configuration loaded: {}",
        serde_json::to_string(&sanitized).unwrap_or_default()
    );

    // Durable storage and watchlist
    let storage = Arc::new(
        SqliteStorage::new(&config.storage.path)
            .with_context(|| format!("Failed to open storage at {:?}", config.storage.path))?,
    );
    info!("Storage initialized at {:?}", config.storage.path);

    let watchlist = Arc::new(WatchlistManager::new(WatchlistStore::new(storage)));
    info!("Watchlist loaded with {} movies", watchlist.count());

    // Remote catalog and browsing session
    let catalog: Arc<dyn MovieCatalog> = Arc::new(
        TmdbClient::new(config.tmdb.clone()).context("Failed to create TMDB client")?,
    );
    let browser = MovieBrowser::new(Arc::clone(&catalog), config.search.clone());
    browser.pipeline().start_cache_sweeper();

    let state_logger = tokio::spawn(log_state_changes(browser.subscribe()));
    let watchlist_logger = {
        let mut rx = watchlist.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let count = rx.borrow_and_update().len();
                info!("Watchlist now holds {} movies", count);
            }
        })
    };

    if browser.mount().await {
        let state = browser.snapshot();
        match &state.error {
            Some(e) => warn!("Initial popular load failed: {}", e),
            None => info!(
                "Showing {} popular movies (page {}/{})",
                state.popular.len(),
                state.popular_page,
                state.popular_total_pages
            ),
        }
    }

    info!("Browsing session ready, press Ctrl+C to stop");
    shutdown_signal().await;

    info!("Shutting down");
    browser.pipeline().shutdown();
    state_logger.abort();
    watchlist_logger.abort();

    Ok(())
}

/// Read the file named by `MOVIE_LIBRARY_CONFIG` (default `config.toml`),
/// falling back to defaults plus environment when it does not exist.
fn load_configuration() -> Result<Config> {
    let config_path = std::env::var("MOVIE_LIBRARY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    if config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))
    } else {
        info!(
            "No config file at {:?}, using defaults and environment",
            config_path
        );
        load_config_from_env().context("Failed to load config from environment")
    }
}

async fn log_state_changes(mut rx: tokio::sync::watch::Receiver<BrowsingState>) {
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if let Some(e) = &state.error {
            warn!(
                "Browsing error: {} (retry {})",
                e,
                if state.can_retry() { "available" } else { "unavailable" }
            );
        } else if !state.is_loading() {
            info!(
                "Showing {} movies ({:?})",
                state.movies().len(),
                state.mode
            );
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
