//! TMDB metadata source: wire types, the catalog seam, and the HTTP provider.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalization::credits::CreditsLookup;

pub mod provider;

pub use provider::TmdbProvider;

/// One entry of the `movie/top_rated` `results` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genre_ids: Option<Vec<i64>>,
}

/// Envelope of a list page. `results` stays optional so a missing list can be
/// reported with TMDB's own status message instead of a serde error.
#[derive(Debug, Deserialize)]
pub(crate) struct TmdbListResponse {
    pub results: Option<Vec<Value>>,
    pub status_message: Option<String>,
    pub status_code: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbCrewMember {
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbCastMember {
    pub name: String,
}

/// Body of `movie/{id}/credits`; either list may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub crew: Vec<TmdbCrewMember>,
    #[serde(default)]
    pub cast: Vec<TmdbCastMember>,
}

/// Parsed page of top-rated movies.
#[derive(Debug, Clone, Default)]
pub struct TopRatedPage {
    pub movies: Vec<TmdbMovie>,
    /// Entries dropped because they lacked an id or title.
    pub skipped: usize,
}

/// Source of movie metadata and credits.
#[async_trait::async_trait]
pub trait MovieCatalog: Send + Sync {
    /// One page (1-based) of top-rated movies. An error aborts pagination.
    async fn top_rated_page(&self, page: u32, language: &str) -> Result<TopRatedPage>;

    /// Credits for one movie. Never fails outright; failures come back as
    /// [`CreditsLookup::Failed`].
    async fn credits(&self, movie_id: i64) -> CreditsLookup;
}
