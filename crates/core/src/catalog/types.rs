use serde::{Deserialize, Serialize};

/// A movie as returned by the remote catalog. Read-only once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    /// ISO date (YYYY-MM-DD), empty when unknown.
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub overview: String,
    /// Average rating, 0-10.
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

impl Movie {
    /// Extract the release year from the release date.
    pub fn year(&self) -> Option<u32> {
        self.release_date.get(0..4).and_then(|y| y.parse().ok())
    }
}

/// One page of a paginated movie listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviePage {
    pub page: u32,
    pub results: Vec<Movie>,
    pub total_pages: u32,
    pub total_results: u32,
}

impl MoviePage {
    /// Whether more pages follow this one.
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}
