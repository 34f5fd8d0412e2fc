use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{MovieCatalog, TmdbCredits, TmdbListResponse, TmdbMovie, TopRatedPage};
use crate::normalization::credits::{CreditsLookup, MovieCredits};

pub const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Cut `s` to at most `max_len` bytes (on a char boundary) for error messages.
pub(crate) fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}

/// TMDB v3 client for the two endpoints the seeder needs.
///
/// - GET /movie/top_rated?language=..&page=.. - paged list of movies
/// - GET /movie/{id}/credits - crew and cast for one movie
///
/// Authentication uses the `api_key` query parameter. Transport errors are
/// stripped of their URL before they surface, so the key never reaches logs.
#[derive(Debug, Clone)]
pub struct TmdbProvider {
    base_url: String,
    http: Client,
    api_key: String,
}

impl TmdbProvider {
    pub fn new(api_key: String, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing TMDB API key");
        let base_url = base_url
            .unwrap_or(DEFAULT_TMDB_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let http = Client::builder()
            .user_agent("movie-seed/0.1")
            .timeout(timeout)
            .build()
            .context("failed to build TMDB HTTP client")?;
        Ok(Self {
            base_url,
            http,
            api_key: api_key.trim().to_string(),
        })
    }

    async fn get_text(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(reqwest::StatusCode, String)> {
        let resp = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| anyhow!(e.without_url()))
            .with_context(|| format!("request to {url} failed"))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| anyhow!(e.without_url()))
            .with_context(|| format!("reading body from {url} failed"))?;
        Ok((status, body))
    }

    /// Fetch one page of `movie/top_rated`.
    ///
    /// Fails when the request fails, the status is not 2xx, or the body has
    /// no `results` list. Individual entries missing `id`/`title` are skipped.
    #[instrument(skip(self))]
    pub async fn fetch_top_rated_page(&self, page: u32, language: &str) -> Result<TopRatedPage> {
        let url = format!("{}/movie/top_rated", self.base_url);
        let (status, body) = self
            .get_text(
                &url,
                &[("language", language.to_string()), ("page", page.to_string())],
            )
            .await?;

        let parsed: Option<TmdbListResponse> = serde_json::from_str(&body).ok();
        if !status.is_success() {
            let detail = parsed
                .and_then(|p| p.status_message)
                .unwrap_or_else(|| truncate_for_log(body, 500));
            return Err(anyhow!("TMDB top_rated page {page} failed: {status} {detail}"));
        }
        let parsed = parsed
            .ok_or_else(|| anyhow!("TMDB top_rated page {page}: body is not a JSON object"))?;
        let Some(results) = parsed.results else {
            return Err(anyhow!(
                "TMDB top_rated page {page}: response missing `results` (status_code={:?}, status_message={:?})",
                parsed.status_code,
                parsed.status_message
            ));
        };

        let mut out = TopRatedPage {
            movies: Vec::with_capacity(results.len()),
            skipped: 0,
        };
        for raw in results {
            match serde_json::from_value::<TmdbMovie>(raw) {
                Ok(movie) => out.movies.push(movie),
                Err(err) => {
                    warn!(page, error = %err, "skipping malformed top_rated entry");
                    out.skipped += 1;
                }
            }
        }
        debug!(page, movies = out.movies.len(), "top_rated page parsed");
        Ok(out)
    }

    /// Fetch and parse `movie/{id}/credits`.
    #[instrument(skip(self))]
    pub async fn fetch_credits(&self, movie_id: i64) -> Result<TmdbCredits> {
        let url = format!("{}/movie/{movie_id}/credits", self.base_url);
        let (status, body) = self.get_text(&url, &[]).await?;
        if !status.is_success() {
            return Err(anyhow!(
                "TMDB credits for {movie_id} failed: {status} {}",
                truncate_for_log(body, 500)
            ));
        }
        serde_json::from_str(&body)
            .with_context(|| format!("TMDB credits for {movie_id}: unexpected payload"))
    }
}

#[async_trait::async_trait]
impl MovieCatalog for TmdbProvider {
    async fn top_rated_page(&self, page: u32, language: &str) -> Result<TopRatedPage> {
        self.fetch_top_rated_page(page, language).await
    }

    async fn credits(&self, movie_id: i64) -> CreditsLookup {
        match self.fetch_credits(movie_id).await {
            Ok(payload) => CreditsLookup::Resolved(MovieCredits::from_payload(&payload)),
            Err(err) => CreditsLookup::Failed(err),
        }
    }
}
