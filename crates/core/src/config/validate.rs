use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - TMDB API token is present
/// - Request timeout is not 0
/// - Search minimum length, cache TTL and sweep interval are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.tmdb.api_token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "tmdb.api_token is required".to_string(),
        ));
    }

    if config.tmdb.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tmdb.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.search.min_query_length == 0 {
        return Err(ConfigError::ValidationError(
            "search.min_query_length cannot be 0".to_string(),
        ));
    }

    if config.search.cache_ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "search.cache_ttl_secs cannot be 0".to_string(),
        ));
    }

    if config.search.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "search.sweep_interval_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
