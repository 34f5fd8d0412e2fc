use serde::Serialize;

use crate::database_ops::tmdb::TmdbMovie;
use crate::normalization::credits::CreditsLookup;

/// A movie ready for embedding and upload.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
    pub external_id: i64,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub rating: f64,
    pub genre_ids: Vec<i64>,
    pub director: String,
    pub cast_members: Vec<String>,
    /// Embedding input; never written to the store.
    pub summary_text: String,
    /// Empty until the batch embedding pass fills it in.
    pub embedding: Vec<f32>,
}

impl MovieRecord {
    /// Combine a top-rated entry with its credits. Pure; no I/O.
    pub fn assemble(entry: &TmdbMovie, credits: &CreditsLookup) -> Self {
        let overview = entry.overview.clone().unwrap_or_default();
        let genre_ids = entry.genre_ids.clone().unwrap_or_default();
        let director = credits.director().to_string();
        let cast_members = credits.cast().to_vec();
        let summary_text = summary_text(
            &entry.title,
            &overview,
            &genre_ids,
            &director,
            &cast_members,
        );
        Self {
            external_id: entry.id,
            title: entry.title.clone(),
            overview,
            poster_path: entry.poster_path.clone(),
            rating: entry.vote_average.unwrap_or(0.0),
            genre_ids,
            director,
            cast_members,
            summary_text,
            embedding: Vec::new(),
        }
    }

    /// Column view used by the store backends.
    pub fn row(&self) -> MovieRow<'_> {
        MovieRow {
            tmdb_id: self.external_id,
            title: &self.title,
            overview: &self.overview,
            poster_path: self.poster_path.as_deref(),
            vote_average: self.rating,
            genres: &self.genre_ids,
            director: &self.director,
            cast_members: &self.cast_members,
            embedding: &self.embedding,
        }
    }
}

/// Persisted shape of a [`MovieRecord`], keyed by `tmdb_id`.
#[derive(Debug, Serialize)]
pub struct MovieRow<'a> {
    pub tmdb_id: i64,
    pub title: &'a str,
    pub overview: &'a str,
    pub poster_path: Option<&'a str>,
    pub vote_average: f64,
    pub genres: &'a [i64],
    pub director: &'a str,
    pub cast_members: &'a [String],
    pub embedding: &'a [f32],
}

/// Descriptive text fed to the embedding model.
pub fn summary_text(
    title: &str,
    overview: &str,
    genre_ids: &[i64],
    director: &str,
    cast: &[String],
) -> String {
    format!(
        "Title: {title}. Overview: {overview} Genres: {genres}. Director: {director}. Starring: {starring}.",
        genres = format_genre_ids(genre_ids),
        starring = cast.join(", "),
    )
}

/// `[1, 2, 3]`; `[]` when empty.
pub fn format_genre_ids(genre_ids: &[i64]) -> String {
    let parts: Vec<String> = genre_ids.iter().map(|id| id.to_string()).collect();
    format!("[{}]", parts.join(", "))
}
