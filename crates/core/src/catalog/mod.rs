//! Remote movie catalog integration.
//!
//! The catalog is a black-box HTTP dependency serving paginated movie lists.
//! Every transport and HTTP failure is normalized into [`CatalogError`] so
//! callers can decide what to show and whether to offer a retry.

mod tmdb;
mod types;

pub use tmdb::{TmdbClient, TmdbConfig};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Highest page number the catalog accepts.
pub const MAX_PAGE: u32 = 500;

/// Errors that can occur when talking to the remote catalog.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// No response was received (connection refused, DNS, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 429.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimited,

    /// Any other 4xx response.
    #[error("Request rejected ({status}): {message}")]
    Client { status: u16, message: String },

    /// 5xx response.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Successful status but the body did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The caller passed an invalid argument.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Client not configured (missing API credential).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl CatalogError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => CatalogError::RateLimited,
            400..=499 => CatalogError::Client { status, message },
            500..=599 => CatalogError::Server { status, message },
            _ => CatalogError::MalformedResponse(format!(
                "unexpected status {}: {}",
                status, message
            )),
        }
    }

    /// Numeric status associated with the error. Network failures report 0.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CatalogError::Network(_) => Some(0),
            CatalogError::RateLimited => Some(429),
            CatalogError::Client { status, .. } | CatalogError::Server { status, .. } => {
                Some(*status)
            }
            CatalogError::MalformedResponse(_) => Some(200),
            CatalogError::Validation(_) | CatalogError::NotConfigured(_) => None,
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::Network(_) | CatalogError::RateLimited | CatalogError::Server { .. }
        )
    }
}

/// Reject page numbers outside `1..=MAX_PAGE`.
pub fn validate_page(page: u32) -> Result<(), CatalogError> {
    if page == 0 || page > MAX_PAGE {
        return Err(CatalogError::Validation(format!(
            "page must be between 1 and {}, got {}",
            MAX_PAGE, page
        )));
    }
    Ok(())
}

/// Trim `query` and reject it if nothing is left.
pub fn validate_query(query: &str) -> Result<&str, CatalogError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Validation(
            "search query must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Trait for remote movie catalogs.
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Fetch one page of the popular movies listing.
    async fn popular_movies(&self, page: u32) -> Result<MoviePage, CatalogError>;

    /// Search movies by title text.
    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError>;
}
