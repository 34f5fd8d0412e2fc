//! Seed run: fetch → enrich → assemble → embed (one batch) → upload.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::database_ops::movies::MovieSink;
use crate::database_ops::tmdb::MovieCatalog;
use crate::embedding::{embed_records, Embedder};
use crate::normalization::credits::CreditsLookup;
use crate::normalization::movie::MovieRecord;

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Pages `1..=pages` are requested; no adaptive pagination.
    pub pages: u32,
    pub language: String,
    /// Pause after every processed page.
    pub page_delay: Duration,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_fetched: u32,
    pub pagination_aborted: bool,
    pub movies_collected: usize,
    pub entries_skipped: usize,
    pub credit_failures: usize,
    pub missing_directors: usize,
    pub embedding_dim: usize,
    pub uploaded: usize,
    pub upload_failures: usize,
}

/// One seed run over explicit collaborators.
///
/// `sink: None` is a dry run: everything up to and including embedding
/// happens, nothing is written.
pub struct SeedPipeline<'a> {
    catalog: &'a dyn MovieCatalog,
    embedder: &'a dyn Embedder,
    sink: Option<&'a dyn MovieSink>,
    options: PipelineOptions,
}

impl<'a> SeedPipeline<'a> {
    pub fn new(
        catalog: &'a dyn MovieCatalog,
        embedder: &'a dyn Embedder,
        sink: Option<&'a dyn MovieSink>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            catalog,
            embedder,
            sink,
            options,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let mut records = self.collect_records(&mut summary).await;
        summary.movies_collected = records.len();

        info!(
            movies = records.len(),
            model = self.embedder.model_name(),
            "generating embeddings"
        );
        summary.embedding_dim = embed_records(self.embedder, &mut records)
            .await
            .context("embedding generation failed")?;

        match self.sink {
            Some(sink) => self.upload(sink, &records, &mut summary).await,
            None => info!(movies = records.len(), "dry run; skipping upload"),
        }

        info!(summary = ?summary, "seed run finished");
        Ok(summary)
    }

    /// Walk the configured pages, enriching each entry as it arrives.
    async fn collect_records(&self, summary: &mut RunSummary) -> Vec<MovieRecord> {
        let mut records = Vec::new();
        info!(pages = self.options.pages, "fetching top rated movies");
        for page in 1..=self.options.pages {
            let listing = match self
                .catalog
                .top_rated_page(page, &self.options.language)
                .await
            {
                Ok(listing) => listing,
                Err(err) => {
                    error!(
                        page,
                        error = %format!("{err:#}"),
                        "top rated page failed; stopping pagination"
                    );
                    summary.pagination_aborted = true;
                    break;
                }
            };
            summary.pages_fetched += 1;
            summary.entries_skipped += listing.skipped;

            for movie in &listing.movies {
                let credits = self.catalog.credits(movie.id).await;
                if let CreditsLookup::Failed(err) = &credits {
                    warn!(
                        tmdb_id = movie.id,
                        title = %movie.title,
                        error = %format!("{err:#}"),
                        "credits lookup failed; using fallback director/cast"
                    );
                    summary.credit_failures += 1;
                } else if credits.missing_director() {
                    summary.missing_directors += 1;
                }
                let record = MovieRecord::assemble(movie, &credits);
                info!(
                    page,
                    tmdb_id = record.external_id,
                    title = %record.title,
                    director = %record.director,
                    "processed"
                );
                records.push(record);
            }

            if !self.options.page_delay.is_zero() {
                tokio::time::sleep(self.options.page_delay).await;
            }
        }
        records
    }

    /// Upsert records one by one; a failure is logged and skipped.
    async fn upload(
        &self,
        sink: &dyn MovieSink,
        records: &[MovieRecord],
        summary: &mut RunSummary,
    ) {
        info!(movies = records.len(), backend = sink.name(), "uploading");
        for record in records {
            match sink.upsert(record).await {
                Ok(()) => summary.uploaded += 1,
                Err(err) => {
                    warn!(
                        tmdb_id = record.external_id,
                        title = %record.title,
                        error = %format!("{err:#}"),
                        "error uploading movie"
                    );
                    summary.upload_failures += 1;
                }
            }
        }
    }
}
