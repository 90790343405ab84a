pub mod browse;
pub mod catalog;
pub mod config;
pub mod search;
pub mod storage;
pub mod testing;
pub mod watchlist;

pub use browse::{BrowsingState, DisplayMode, MovieBrowser};
pub use catalog::{CatalogError, Movie, MovieCatalog, MoviePage, TmdbClient, TmdbConfig};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, SanitizedConfig, StorageConfig,
};
pub use search::{SearchConfig, SearchEvent, SearchPhase, SearchPipeline};
pub use storage::{KeyValueStorage, MemoryStorage, SqliteStorage, StorageError};
pub use watchlist::{
    WatchlistChange, WatchlistError, WatchlistItem, WatchlistManager, WatchlistStore,
    WATCHLIST_KEY,
};
