//! Search pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for the keystroke-to-request pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke before searching (milliseconds).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Queries shorter than this (after trimming) are not searched.
    #[serde(default = "default_min_query_length")]
    pub min_query_length: usize,

    /// How long a cached result set stays valid (seconds).
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// How often expired cache entries are swept (seconds).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_min_query_length() -> usize {
    2
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_length: default_min_query_length(),
            cache_ttl_secs: default_cache_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
