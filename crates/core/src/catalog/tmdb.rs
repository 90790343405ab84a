//! TMDB (The Movie Database) API client.
//!
//! Authenticates with a v4 read access token sent as a bearer credential.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use super::types::{Movie, MoviePage};
use super::{validate_page, validate_query, CatalogError, MovieCatalog};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";

/// TMDB API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    /// TMDB read access token (required).
    #[serde(default)]
    pub api_token: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Image base URL for posters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base_url: Option<String>,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            base_url: None,
            image_base_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// TMDB API client.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_token: String,
    image_base_url: String,
}

impl TmdbClient {
    /// Create a new TMDB client. Fails if no credential is configured.
    pub fn new(config: TmdbConfig) -> Result<Self, CatalogError> {
        if config.api_token.trim().is_empty() {
            return Err(CatalogError::NotConfigured(
                "TMDB API token is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CatalogError::NotConfigured(format!("HTTP client: {}", e)))?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let image_base_url = config
            .image_base_url
            .unwrap_or_else(|| DEFAULT_IMAGE_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_token: config.api_token,
            image_base_url,
        })
    }

    /// Build a full image URL for a poster path, e.g. `poster_url(path, "w500")`.
    pub fn poster_url(&self, poster_path: Option<&str>, size: &str) -> Option<String> {
        poster_path.map(|p| {
            let p = if p.starts_with('/') {
                p.to_string()
            } else {
                format!("/{}", p)
            };
            format!("{}/{}{}", self.image_base_url, size, p)
        })
    }

    async fn get_page(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<MoviePage, CatalogError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .header(header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| CatalogError::Network(format!("No response from TMDB: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::from_status(
                status.as_u16(),
                error_message(status.as_u16(), &body),
            ));
        }

        let body: Value = response.json().await.map_err(|e| {
            CatalogError::MalformedResponse(format!("Response is not valid JSON: {}", e))
        })?;

        parse_movie_page(body)
    }
}

#[async_trait]
impl MovieCatalog for TmdbClient {
    async fn popular_movies(&self, page: u32) -> Result<MoviePage, CatalogError> {
        validate_page(page)?;

        debug!("TMDB popular movies: page={}", page);

        self.get_page("/movie/popular", &[("page", page.to_string())])
            .await
    }

    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        let query = validate_query(query)?;
        validate_page(page)?;

        debug!("TMDB movie search: query='{}', page={}", query, page);

        self.get_page(
            "/search/movie",
            &[("query", query.to_string()), ("page", page.to_string())],
        )
        .await
    }
}

/// Pick a readable message out of a TMDB error body.
fn error_message(status: u16, body: &str) -> String {
    let from_body = serde_json::from_str::<TmdbErrorBody>(body)
        .ok()
        .and_then(|b| b.status_message);

    from_body.unwrap_or_else(|| match status {
        401 => "Invalid or missing TMDB API token".to_string(),
        404 => "The requested resource was not found".to_string(),
        429 => "Too many requests".to_string(),
        500..=599 => "TMDB is temporarily unavailable".to_string(),
        _ => format!("Request failed with status {}", status),
    })
}

/// Validate the listing shape and convert it.
fn parse_movie_page(body: Value) -> Result<MoviePage, CatalogError> {
    if !body.get("results").is_some_and(Value::is_array) {
        return Err(CatalogError::MalformedResponse(
            "Response does not contain a results list".to_string(),
        ));
    }

    let response: TmdbListResponse = serde_json::from_value(body).map_err(|e| {
        CatalogError::MalformedResponse(format!("Failed to parse movie list: {}", e))
    })?;

    Ok(response.into())
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbErrorBody {
    status_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbListResponse {
    #[serde(default)]
    page: u32,
    results: Vec<TmdbMovieResult>,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    total_results: u32,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieResult {
    id: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    title: String,
    poster_path: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    release_date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    overview: String,
    vote_average: Option<f32>,
    #[serde(default)]
    genre_ids: Vec<u32>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Conversions
// ============================================================================

impl From<TmdbMovieResult> for Movie {
    fn from(r: TmdbMovieResult) -> Self {
        Self {
            id: r.id,
            title: r.title,
            poster_path: r.poster_path,
            release_date: r.release_date,
            overview: r.overview,
            vote_average: r.vote_average.unwrap_or(0.0).clamp(0.0, 10.0),
            genre_ids: r.genre_ids,
        }
    }
}

impl From<TmdbListResponse> for MoviePage {
    fn from(r: TmdbListResponse) -> Self {
        Self {
            page: r.page,
            results: r.results.into_iter().map(Movie::from).collect(),
            total_pages: r.total_pages,
            total_results: r.total_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> TmdbClient {
        TmdbClient::new(TmdbConfig {
            api_token: "token".to_string(),
            base_url: Some("http://127.0.0.1:9/".to_string()),
            image_base_url: None,
            timeout_secs: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_missing_token_is_not_configured() {
        let result = TmdbClient::new(TmdbConfig {
            api_token: "  ".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(CatalogError::NotConfigured(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(client().base_url, "http://127.0.0.1:9");
    }

    #[test]
    fn test_poster_url() {
        let client = client();
        assert_eq!(
            client.poster_url(Some("/abc.jpg"), "w500"),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg".to_string())
        );
        assert_eq!(
            client.poster_url(Some("abc.jpg"), "original"),
            Some("https://image.tmdb.org/t/p/original/abc.jpg".to_string())
        );
        assert_eq!(client.poster_url(None, "w500"), None);
    }

    #[test]
    fn test_parse_movie_page() {
        let body = json!({
            "page": 1,
            "results": [{
                "id": 603,
                "title": "The Matrix",
                "poster_path": "/poster.jpg",
                "release_date": "1999-03-30",
                "overview": "A computer hacker...",
                "vote_average": 8.2,
                "genre_ids": [28, 878]
            }, {
                "id": 604,
                "title": "The Matrix Reloaded",
                "poster_path": null,
                "release_date": null
            }],
            "total_pages": 2,
            "total_results": 21
        });

        let page = parse_movie_page(body).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].genre_ids, vec![28, 878]);
        assert_eq!(page.results[1].poster_path, None);
        assert_eq!(page.results[1].release_date, "");
        assert_eq!(page.results[1].vote_average, 0.0);
    }

    #[test]
    fn test_parse_movie_page_without_results_is_malformed() {
        let err = parse_movie_page(json!({"page": 1})).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse(_)));

        let err = parse_movie_page(json!({"results": {"id": 1}})).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_movie_page_bad_entry_is_malformed() {
        let err = parse_movie_page(json!({"results": [{"title": "no id"}]})).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse(_)));
    }

    #[test]
    fn test_error_message_prefers_body() {
        let body = r#"{"status_code":7,"status_message":"Invalid API key: You must be granted a valid key.","success":false}"#;
        assert_eq!(
            error_message(401, body),
            "Invalid API key: You must be granted a valid key."
        );
        assert_eq!(error_message(503, "<html>"), "TMDB is temporarily unavailable");
    }

    #[tokio::test]
    async fn test_validation_happens_before_request() {
        let client = client();

        let err = client.popular_movies(0).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        let err = client.search_movies("   ", 1).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        let err = client.search_movies("matrix", 501).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }
}
