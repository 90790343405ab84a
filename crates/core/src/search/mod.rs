//! Search pipeline.
//!
//! Raw keystrokes go in; debounced, de-duplicated, cached catalog searches
//! come out as [`SearchEvent`]s.

mod cache;
mod config;
mod pipeline;
mod timer;
mod types;

pub use cache::{normalize_query, SearchCache};
pub use config::SearchConfig;
pub use pipeline::SearchPipeline;
pub use timer::DebounceTimer;
pub use types::*;
