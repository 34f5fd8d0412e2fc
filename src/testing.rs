//! In-memory collaborators for pipeline tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use crate::database_ops::movies::MovieSink;
use crate::database_ops::tmdb::{
    MovieCatalog, TmdbCastMember, TmdbCredits, TmdbCrewMember, TmdbMovie, TopRatedPage,
};
use crate::embedding::Embedder;
use crate::normalization::credits::{CreditsLookup, MovieCredits};
use crate::normalization::movie::MovieRecord;

/// Bare top-rated entry.
pub fn movie(id: i64, title: &str) -> TmdbMovie {
    TmdbMovie {
        id,
        title: title.to_string(),
        overview: None,
        poster_path: None,
        vote_average: None,
        genre_ids: None,
    }
}

/// Record shaped like the reference scenario: genres [1, 2], director "A",
/// cast X/Y/Z, empty overview.
pub fn record(id: i64, title: &str) -> MovieRecord {
    let entry = TmdbMovie {
        overview: Some(String::new()),
        genre_ids: Some(vec![1, 2]),
        ..movie(id, title)
    };
    let credits = TmdbCredits {
        crew: vec![TmdbCrewMember {
            name: "A".into(),
            job: Some("Director".into()),
        }],
        cast: ["X", "Y", "Z", "W"]
            .iter()
            .map(|n| TmdbCastMember { name: n.to_string() })
            .collect(),
    };
    MovieRecord::assemble(
        &entry,
        &CreditsLookup::Resolved(MovieCredits::from_payload(&credits)),
    )
}

#[derive(Default)]
pub struct FakeCatalog {
    pages: HashMap<u32, Result<Vec<TmdbMovie>, String>>,
    credits: HashMap<i64, Result<TmdbCredits, String>>,
    requested: Mutex<Vec<u32>>,
}

impl FakeCatalog {
    pub fn with_page(mut self, page: u32, movies: Vec<TmdbMovie>) -> Self {
        self.pages.insert(page, Ok(movies));
        self
    }

    pub fn with_failing_page(mut self, page: u32, reason: &str) -> Self {
        self.pages.insert(page, Err(reason.to_string()));
        self
    }

    pub fn with_credits(mut self, movie_id: i64, credits: TmdbCredits) -> Self {
        self.credits.insert(movie_id, Ok(credits));
        self
    }

    pub fn with_failing_credits(mut self, movie_id: i64, reason: &str) -> Self {
        self.credits.insert(movie_id, Err(reason.to_string()));
        self
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MovieCatalog for FakeCatalog {
    async fn top_rated_page(&self, page: u32, _language: &str) -> Result<TopRatedPage> {
        self.requested.lock().unwrap().push(page);
        match self.pages.get(&page) {
            Some(Ok(movies)) => Ok(TopRatedPage {
                movies: movies.clone(),
                skipped: 0,
            }),
            Some(Err(reason)) => Err(anyhow!(reason.clone())),
            None => Ok(TopRatedPage::default()),
        }
    }

    async fn credits(&self, movie_id: i64) -> CreditsLookup {
        match self.credits.get(&movie_id) {
            Some(Ok(payload)) => CreditsLookup::Resolved(MovieCredits::from_payload(payload)),
            Some(Err(reason)) => CreditsLookup::Failed(anyhow!(reason.clone())),
            None => CreditsLookup::Resolved(MovieCredits::default()),
        }
    }
}

/// Deterministic embedder: each text maps to a vector derived from its hash.
pub struct FakeEmbedder {
    dim: usize,
    declared: Option<usize>,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            declared: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_declared_dimension(mut self, dim: usize) -> Self {
        self.declared = Some(dim);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(text: &str, dim: usize) -> Vec<f32> {
        // FNV-1a
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (0..dim)
            .map(|i| ((hash >> ((i % 8) * 8)) & 0xff) as f32 + i as f32 * 256.0)
            .collect()
    }
}

#[async_trait::async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake"
    }

    fn dimension(&self) -> Option<usize> {
        self.declared
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| Self::vector_for(t, self.dim))
            .collect())
    }
}

/// Keyed in-memory table with upsert-overwrite semantics.
#[derive(Default)]
pub struct MemorySink {
    rows: Mutex<BTreeMap<i64, MovieRecord>>,
    fail_ids: HashSet<i64>,
    attempts: AtomicUsize,
}

impl MemorySink {
    pub fn failing_on(mut self, tmdb_id: i64) -> Self {
        self.fail_ids.insert(tmdb_id);
        self
    }

    pub fn get(&self, tmdb_id: i64) -> Option<MovieRecord> {
        self.rows.lock().unwrap().get(&tmdb_id).cloned()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.rows.lock().unwrap().keys().copied().collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MovieSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, record: &MovieRecord) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_ids.contains(&record.external_id) {
            return Err(anyhow!("simulated store error for {}", record.external_id));
        }
        self.rows
            .lock()
            .unwrap()
            .insert(record.external_id, record.clone());
        Ok(())
    }
}

#[tokio::test]
async fn memory_sink_upsert_is_idempotent() {
    let sink = MemorySink::default();
    let first = record(42, "Test Film");
    let mut second = record(42, "Test Film (Restored)");
    second.rating = 9.1;
    sink.upsert(&first).await.unwrap();
    sink.upsert(&second).await.unwrap();
    assert_eq!(sink.ids(), vec![42]);
    assert_eq!(sink.get(42).unwrap(), second);
}
